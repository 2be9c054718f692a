//! Track and trigger throughput.
//!
//! Measures the cost of reading through a proxy inside an effect and of
//! propagating a write to a growing number of subscribed effects.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ripple_core::{effect, reactive, Computed, Effect, Proxy, RawObject};

// =============================================================================
// Fixtures
// =============================================================================

fn state(keys: usize) -> Proxy {
    let raw = RawObject::from_entries((0..keys).map(|i| (format!("key_{i}"), i as f64)));
    reactive(raw)
        .into_proxy()
        .expect("objects are always proxied")
}

fn subscribers(state: &Proxy, count: usize) -> Vec<Effect<()>> {
    (0..count)
        .map(|_| {
            let reader = state.clone();
            effect(move || {
                black_box(reader.get("key_0"));
            })
        })
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_tracked_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracked_reads");

    for keys in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            let state = state(keys);
            let names: Vec<String> = (0..keys).map(|i| format!("key_{i}")).collect();
            let reader = state.clone();
            let handle = effect(move || {
                for name in &names {
                    black_box(reader.get(name.as_str()));
                }
            });
            b.iter(|| handle.run());
            handle.stop();
        });
    }

    group.finish();
}

fn bench_trigger_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigger_fan_out");

    for count in [1usize, 64, 1024] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let state = state(1);
            let effects = subscribers(&state, count);
            let mut next = 0.0;
            b.iter(|| {
                next += 1.0;
                state.set("key_0", next);
            });
            effects.iter().for_each(Effect::stop);
        });
    }

    group.finish();
}

fn bench_computed_chain(c: &mut Criterion) {
    c.bench_function("computed_chain_depth_32", |b| {
        let state = state(1);
        let reader = state.clone();
        let mut chain = vec![Computed::new(move || {
            reader.get("key_0").as_f64().unwrap_or_default()
        })];
        for _ in 1..32 {
            let upstream = chain[chain.len() - 1].clone();
            chain.push(Computed::new(move || upstream.get() + 1.0));
        }
        let tail = chain[chain.len() - 1].clone();

        let mut next = 0.0;
        b.iter(|| {
            next += 1.0;
            state.set("key_0", next);
            black_box(tail.get())
        });
    });
}

criterion_group!(
    benches,
    bench_tracked_reads,
    bench_trigger_fan_out,
    bench_computed_chain
);
criterion_main!(benches);
