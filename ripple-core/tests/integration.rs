//! Integration Tests for Reactive System
//!
//! These tests verify that proxies, the dependency store and effects work
//! together correctly through the public API only.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ripple_core::reactive::{EffectOptions, EffectRef, ReactiveContext, Runtime};
use ripple_core::{
    effect, effect_with, is_reactive, is_readonly, reactive, readonly, shallow_reactive, stop,
    to_raw, Computed, Effect, Key, Proxy, RawObject, Ref, Value,
};

fn proxy_of(value: Value) -> Proxy {
    value.into_proxy().expect("object values are proxied")
}

/// Run `body` in an effect, counting its runs.
fn counted(body: impl Fn() + 'static) -> (Rc<Cell<usize>>, Effect<()>) {
    let runs = Rc::new(Cell::new(0));
    let runs_clone = runs.clone();
    let handle = effect(move || {
        runs_clone.set(runs_clone.get() + 1);
        body();
    });
    (runs, handle)
}

/// Test that a write re-runs exactly the effects that read the key.
#[test]
fn writes_rerun_only_readers_of_the_key() {
    let state = proxy_of(reactive(RawObject::from_entries([("a", 1), ("b", 1)])));

    let reader = state.clone();
    let (a_runs, _a) = counted(move || {
        reader.get("a");
    });
    let reader = state.clone();
    let (b_runs, _b) = counted(move || {
        reader.get("b");
    });

    state.set("a", 2);
    assert_eq!((a_runs.get(), b_runs.get()), (2, 1));
    state.set("a", 3);
    assert_eq!((a_runs.get(), b_runs.get()), (3, 1));
}

/// Test that writing the stored value again triggers nothing, with NaN
/// counted as unchanged and signed zero as changed.
#[test]
fn unchanged_writes_are_silent() {
    let state = proxy_of(reactive(RawObject::from_entries([("n", f64::NAN)])));
    let reader = state.clone();
    let (runs, _effect) = counted(move || {
        reader.get("n");
    });

    state.set("n", f64::NAN);
    assert_eq!(runs.get(), 1);

    state.set("n", 0.0);
    assert_eq!(runs.get(), 2);
    state.set("n", 0.0);
    assert_eq!(runs.get(), 2);
    state.set("n", -0.0);
    assert_eq!(runs.get(), 3);
}

/// Test that deleting an existing key notifies key readers and
/// enumerators, while deleting a missing key notifies nobody.
#[test]
fn deletes_notify_key_and_iteration_readers() {
    let state = proxy_of(reactive(RawObject::from_entries([("a", 1)])));

    let reader = state.clone();
    let (key_runs, _key) = counted(move || {
        reader.get("a");
    });
    let reader = state.clone();
    let (iteration_runs, _iteration) = counted(move || {
        reader.own_keys();
    });

    assert!(state.delete("missing"));
    assert_eq!((key_runs.get(), iteration_runs.get()), (1, 1));

    assert!(state.delete("a"));
    assert_eq!((key_runs.get(), iteration_runs.get()), (2, 2));
}

/// Test that enumerating keys depends on shape, not on values.
#[test]
fn enumeration_depends_on_shape_only() {
    let state = proxy_of(reactive(RawObject::from_entries([("a", 1)])));
    let reader = state.clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    let (runs, _effect) = counted(move || {
        *seen_clone.borrow_mut() = reader.own_keys();
    });

    state.set("a", 2);
    assert_eq!(runs.get(), 1);

    state.set("b", 1);
    assert_eq!(runs.get(), 2);
    assert_eq!(*seen.borrow(), [Key::from("a"), Key::from("b")]);
}

/// Test that pushing inside an effect that reads elements does not make
/// the effect trigger itself through the length update.
#[test]
fn push_inside_an_effect_does_not_loop() {
    let list = proxy_of(reactive(RawObject::array([1, 2])));
    let source = proxy_of(reactive(RawObject::from_entries([("next", 3)])));

    let (writer, input) = (list.clone(), source.clone());
    let (runs, _effect) = counted(move || {
        writer.get(0usize);
        writer.push([input.get("next")]);
    });
    assert_eq!(runs.get(), 1);
    assert_eq!(list.len(), 3);

    source.set("next", 4);
    assert_eq!(runs.get(), 2);
    assert_eq!(list.len(), 4);
}

/// Test that identity searches work across raw and wrapped values.
#[test]
fn searches_see_through_proxies() {
    let member = RawObject::plain();

    let raw_elements = proxy_of(reactive(RawObject::array([member.clone()])));
    assert!(raw_elements.includes(reactive(member.clone())));
    assert_eq!(raw_elements.index_of(reactive(member.clone())), Some(0));

    let wrapped_elements = proxy_of(reactive(RawObject::array([reactive(member.clone())])));
    assert!(wrapped_elements.includes(member.clone()));
    assert_eq!(wrapped_elements.index_of(member), Some(0));
}

/// Test that wrapping is referentially stable per variant.
#[test]
fn wrapping_is_stable() {
    let raw = RawObject::from_entries([("a", 1)]);
    let first = reactive(raw.clone());
    assert_eq!(reactive(raw.clone()), first);
    assert_eq!(reactive(first.clone()), first);
    assert_eq!(readonly(raw.clone()), readonly(raw.clone()));
    assert_ne!(readonly(raw.clone()), first);
    assert_eq!(to_raw(&first), Value::Object(raw));
}

/// Test that a stopped effect is never invoked by later writes.
#[test]
fn stopped_effects_leave_every_dependency() {
    let state = proxy_of(reactive(RawObject::from_entries([("a", 1), ("b", 1)])));
    let reader = state.clone();
    let (runs, handle) = counted(move || {
        reader.get("a");
        reader.get("b");
    });
    assert_eq!(handle.dependency_count(), 2);

    stop(&handle);
    assert_eq!(handle.dependency_count(), 0);
    assert_eq!(Runtime::subscriber_count(&to_raw_object(&state), &Key::from("a")), 0);

    state.set("a", 2);
    state.set("b", 2);
    assert_eq!(runs.get(), 1);
}

fn to_raw_object(proxy: &Proxy) -> RawObject {
    proxy.target().raw()
}

/// Test that the outer effect is current again once a nested effect has
/// run, so later reads are attributed to it.
#[test]
fn nested_effects_restore_the_outer_effect() {
    let state = proxy_of(reactive(RawObject::from_entries([("inner", 1), ("outer", 1)])));
    let inner_runs = Rc::new(Cell::new(0));
    let inner_handles = Rc::new(RefCell::new(Vec::new()));

    let (reader, runs, handles) = (state.clone(), inner_runs.clone(), inner_handles.clone());
    let (outer_runs, outer) = counted(move || {
        let inner_reader = reader.clone();
        let runs = runs.clone();
        let inner = effect(move || {
            runs.set(runs.get() + 1);
            inner_reader.get("inner");
        });
        handles.borrow_mut().push(inner);
        assert!(ReactiveContext::current_subscriber().is_some());
        reader.get("outer");
    });

    assert_eq!(outer.dependency_count(), 1);
    state.set("inner", 2);
    assert_eq!((outer_runs.get(), inner_runs.get()), (1, 2));

    state.set("outer", 2);
    assert_eq!(outer_runs.get(), 2);
}

/// Test that schedulers receive effects and decide when they run.
#[test]
fn schedulers_batch_reruns() {
    let state = proxy_of(reactive(RawObject::from_entries([("a", 1), ("b", 1)])));
    let queue: Rc<RefCell<Vec<EffectRef>>> = Rc::new(RefCell::new(Vec::new()));
    let pending = queue.clone();
    let runs = Rc::new(Cell::new(0));
    let runs_clone = runs.clone();
    let reader = state.clone();

    let _effect = effect_with(
        move || {
            runs_clone.set(runs_clone.get() + 1);
            reader.get("a");
            reader.get("b");
        },
        EffectOptions::new().scheduler(move |effect| pending.borrow_mut().push(effect)),
    );

    state.set("a", 2);
    state.set("b", 2);
    assert_eq!(runs.get(), 1);
    assert_eq!(queue.borrow().len(), 2);

    let mut flushed = queue.borrow_mut().drain(..).collect::<Vec<_>>();
    flushed.dedup();
    for effect in flushed {
        effect.run();
    }
    assert_eq!(runs.get(), 2);
}

/// Test that readonly views reflect reactive state but reject writes.
#[test]
fn readonly_views_follow_reactive_state() {
    let state = reactive(RawObject::from_entries([("a", 1)]));
    let view = readonly(state.clone());
    assert!(is_readonly(&view) && is_reactive(&view));

    let view = proxy_of(view);
    let state = proxy_of(state);
    let seen = Rc::new(Cell::new(0.0));
    let seen_clone = seen.clone();
    let _effect = effect(move || seen_clone.set(view.get("a").as_f64().unwrap_or_default()));

    state.set("a", 9);
    assert_eq!(seen.get(), 9.0);
}

/// Test that shallow proxies leave nested objects untouched.
#[test]
fn shallow_proxies_do_not_track_nested_writes() {
    let nested = RawObject::from_entries([("x", 1)]);
    let state = proxy_of(shallow_reactive(RawObject::from_entries([("nested", nested.clone())])));
    let reader = state.clone();
    let (runs, _effect) = counted(move || {
        if let Value::Object(object) = reader.get("nested") {
            object.get("x");
        }
    });

    nested.set("x", 2);
    assert_eq!(runs.get(), 1);
    state.set("nested", RawObject::plain());
    assert_eq!(runs.get(), 2);
}

/// Test the complete chain: proxy -> computed -> effect.
#[test]
fn full_reactive_chain() {
    let state = proxy_of(reactive(RawObject::from_entries([("price", 10), ("quantity", 2)])));
    let reader = state.clone();
    let total = Computed::new(move || {
        let price = reader.get("price").as_f64().unwrap_or_default();
        let quantity = reader.get("quantity").as_f64().unwrap_or_default();
        price * quantity
    });

    let cell = Ref::new(0);
    let (total_reader, sink) = (total.clone(), cell.clone());
    let (runs, _effect) = counted(move || sink.set(total_reader.get()));
    assert_eq!(cell.get_untracked(), Value::from(20));

    state.set("quantity", 3);
    assert_eq!(cell.get_untracked(), Value::from(30));
    assert_eq!(runs.get(), 2);
}

/// Test that arrays of refs hand back the ref itself on index reads while
/// object properties unwrap it.
#[test]
fn refs_in_arrays_are_not_unwrapped() {
    let cell = Ref::new(1);
    let list = proxy_of(reactive(RawObject::array([cell.clone()])));
    let object = proxy_of(reactive(RawObject::from_entries([("cell", cell.clone())])));

    assert_eq!(list.get(0usize), Value::Ref(cell.clone()));
    assert_eq!(object.get("cell"), Value::from(1));
}

/// Test that a panicking effect leaves the runtime usable.
#[test]
fn runtime_recovers_from_a_panicking_effect() {
    let state = proxy_of(reactive(RawObject::from_entries([("fail", false)])));
    let reader = state.clone();
    let _effect = effect(move || {
        if reader.get("fail").is_true() {
            panic!("effect failed");
        }
    });

    let writer = state.clone();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        writer.set("fail", true);
    }));
    assert!(outcome.is_err());
    assert!(!ReactiveContext::is_active());
    assert!(!Runtime::is_tracking());

    let reader = state.clone();
    let (runs, _after) = counted(move || {
        reader.get("fail");
    });
    assert_eq!(runs.get(), 1);
}
