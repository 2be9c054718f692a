//! Effect Implementation
//!
//! An Effect is a computation that re-runs whenever data it read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies (unless it is lazy).
//!
//! 2. Every run first leaves all dependency sets joined by the previous
//!    run, then runs the function inside a [`ReactiveContext`], so the
//!    dependencies always reflect the latest run only.
//!
//! 3. When a dependency changes, the runtime runs the effect again, or
//!    hands it to its scheduler if it has one.
//!
//! # Re-entrancy
//!
//! An effect that is already running (anywhere on the effect stack) skips
//! a nested run of itself and returns `None`, unless it was created with
//! `allow_recurse`.
//!
//! # Stopping
//!
//! [`Effect::stop`] leaves every dependency set, calls `on_stop`, and
//! deactivates the effect for good. Running a stopped effect calls its
//! function without tracking, or does nothing if it has a scheduler.
//!
//! Dependency sets hold their effects strongly. An effect whose closure
//! owns a handle to something it reads therefore stays alive until it is
//! stopped, even after every [`Effect`] handle is dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::runtime::{DepSet, Operation};
use super::subscriber::{EffectRef, Subscriber, SubscriberId};
use crate::value::{Key, ObjectId, Value};

/// What a debug hook is told about one track or trigger.
#[derive(Debug, Clone)]
pub struct DebuggerEvent {
    pub effect: SubscriberId,
    pub target: ObjectId,
    pub operation: Operation,
    pub key: Option<Key>,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
}

pub type Scheduler = Rc<dyn Fn(EffectRef)>;
pub type DebugHook = Rc<dyn Fn(&DebuggerEvent)>;

/// Options for [`effect_with`].
///
/// # Example
///
/// ```rust,ignore
/// let queue = Rc::new(RefCell::new(Vec::new()));
/// let pending = queue.clone();
/// let handle = effect_with(
///     move || render(&state),
///     EffectOptions::new().scheduler(move |effect| pending.borrow_mut().push(effect)),
/// );
/// ```
#[derive(Clone, Default)]
pub struct EffectOptions {
    lazy: bool,
    allow_recurse: bool,
    scheduler: Option<Scheduler>,
    on_track: Option<DebugHook>,
    on_trigger: Option<DebugHook>,
    on_stop: Option<Rc<dyn Fn()>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the initial run.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Let the effect re-enter itself and be triggered by its own writes.
    pub fn allow_recurse(mut self, allow_recurse: bool) -> Self {
        self.allow_recurse = allow_recurse;
        self
    }

    /// Receive the effect on trigger instead of having it run.
    pub fn scheduler(mut self, scheduler: impl Fn(EffectRef) + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn on_track(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_track = Some(Rc::new(hook));
        self
    }

    pub fn on_trigger(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_trigger = Some(Rc::new(hook));
        self
    }

    pub fn on_stop(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_stop = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("allow_recurse", &self.allow_recurse)
            .field("scheduler", &self.scheduler.is_some())
            .field("on_track", &self.on_track.is_some())
            .field("on_trigger", &self.on_trigger.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// The part of an effect that does not depend on its return type.
pub(crate) struct EffectCore {
    id: SubscriberId,
    active: Cell<bool>,
    run_count: Cell<usize>,
    deps: RefCell<SmallVec<[Weak<DepSet>; 4]>>,
    options: EffectOptions,
}

impl EffectCore {
    fn new(options: EffectOptions) -> Self {
        Self {
            id: SubscriberId::new(),
            active: Cell::new(true),
            run_count: Cell::new(0),
            deps: RefCell::new(SmallVec::new()),
            options,
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn allow_recurse(&self) -> bool {
        self.options.allow_recurse
    }

    pub(crate) fn scheduler(&self) -> Option<Scheduler> {
        self.options.scheduler.clone()
    }

    pub(crate) fn add_dep(&self, dep: &Rc<DepSet>) {
        self.deps.borrow_mut().push(Rc::downgrade(dep));
    }

    fn dependency_count(&self) -> usize {
        self.deps
            .borrow()
            .iter()
            .filter(|dep| dep.strong_count() > 0)
            .count()
    }

    /// Leave every dependency set joined by the last run.
    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps.iter().filter_map(Weak::upgrade) {
            dep.remove(self.id);
        }
    }

    pub(crate) fn stop(&self) {
        if !self.active.get() {
            return;
        }
        self.cleanup();
        if let Some(on_stop) = &self.options.on_stop {
            on_stop();
        }
        self.active.set(false);
        tracing::debug!(effect = %self.id, runs = self.run_count.get(), "stopped effect");
    }

    pub(crate) fn on_track(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_track {
            hook(event);
        }
    }

    pub(crate) fn on_trigger(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_trigger {
            hook(event);
        }
    }
}

impl Drop for EffectCore {
    fn drop(&mut self) {
        self.cleanup();
    }
}

struct EffectInner<T> {
    core: EffectCore,
    f: Box<dyn Fn() -> T>,
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn rerun(self: Rc<Self>) {
        run(&self);
    }
}

fn run<T: 'static>(inner: &Rc<EffectInner<T>>) -> Option<T> {
    let core = &inner.core;
    if !core.is_active() {
        return if core.options.scheduler.is_some() {
            None
        } else {
            Some((inner.f)())
        };
    }
    if !core.options.allow_recurse && ReactiveContext::contains(core.id) {
        tracing::trace!(effect = %core.id, "skipped re-entrant run");
        return None;
    }

    core.cleanup();
    let erased: Rc<dyn Subscriber> = inner.clone();
    let _ctx = ReactiveContext::enter(EffectRef(erased));
    core.run_count.set(core.run_count.get() + 1);
    Some((inner.f)())
}

/// A computation that re-runs when the data it read changes.
///
/// Cloning the handle shares the effect. Dropping the last handle disposes
/// of it: the effect leaves its dependency sets and never runs again.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(RawObject::from_entries([("count", 0)]));
/// let reader = state.as_proxy().unwrap().clone();
///
/// let handle = effect(move || println!("count is {:?}", reader.get("count")));
/// state.as_proxy().unwrap().set("count", 5); // prints "count is 5"
/// handle.stop();
/// ```
pub struct Effect<T: 'static>(Rc<EffectInner<T>>);

impl<T: 'static> Effect<T> {
    fn new(f: impl Fn() -> T + 'static, options: EffectOptions) -> Self {
        let lazy = options.lazy;
        let effect = Self(Rc::new(EffectInner {
            core: EffectCore::new(options),
            f: Box::new(f),
        }));
        tracing::debug!(effect = %effect.id(), lazy, "created effect");

        if !lazy {
            effect.run();
        }
        effect
    }

    /// Run the effect now, re-collecting its dependencies.
    ///
    /// Returns `None` when the run is skipped: the effect is already
    /// running, or it is stopped and has a scheduler.
    pub fn run(&self) -> Option<T> {
        run(&self.0)
    }

    /// Detach the effect from all its dependencies. Idempotent.
    pub fn stop(&self) {
        self.0.core.stop();
    }

    pub fn id(&self) -> SubscriberId {
        self.0.core.id
    }

    pub fn is_active(&self) -> bool {
        self.0.core.is_active()
    }

    /// Number of completed or in-flight tracked runs.
    pub fn run_count(&self) -> usize {
        self.0.core.run_count.get()
    }

    /// Number of dependency sets the effect currently belongs to.
    pub fn dependency_count(&self) -> usize {
        self.0.core.dependency_count()
    }

    /// The type-erased handle schedulers receive.
    pub fn as_ref(&self) -> EffectRef {
        let erased: Rc<dyn Subscriber> = self.0.clone();
        EffectRef(erased)
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Create an effect and run it once.
pub fn effect<T: 'static>(f: impl Fn() -> T + 'static) -> Effect<T> {
    Effect::new(f, EffectOptions::default())
}

/// Create an effect with options.
pub fn effect_with<T: 'static>(f: impl Fn() -> T + 'static, options: EffectOptions) -> Effect<T> {
    Effect::new(f, options)
}

/// Stop an effect. Stopping twice is a no-op.
pub fn stop<T: 'static>(effect: &Effect<T>) {
    effect.stop();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::proxy::reactive;
    use crate::reactive::{Runtime, TrackOp, TriggerOp};
    use crate::value::RawObject;

    fn state(entries: &[(&'static str, i32)]) -> crate::proxy::Proxy {
        reactive(RawObject::from_entries(entries.iter().copied()))
            .into_proxy()
            .unwrap()
    }

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let _effect = effect(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn lazy_effect_does_not_run_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let handle = effect_with(
            move || {
                run_count_clone.set(run_count_clone.get() + 1);
                7
            },
            EffectOptions::new().lazy(true),
        );

        assert_eq!(run_count.get(), 0);
        assert_eq!(handle.run_count(), 0);

        assert_eq!(handle.run(), Some(7));
        assert_eq!(run_count.get(), 1);
        assert_eq!(handle.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_a_read_key_changes() {
        let state = state(&[("a", 1), ("b", 1)]);
        let reader = state.clone();
        let handle = effect(move || {
            reader.get("a");
        });

        state.set("a", 2);
        assert_eq!(handle.run_count(), 2);
        state.set("b", 2);
        assert_eq!(handle.run_count(), 2);
    }

    #[test]
    fn dependencies_follow_the_latest_run() {
        let state = state(&[("flag", 1), ("a", 0), ("b", 0)]);
        let reader = state.clone();
        let handle = effect(move || {
            if reader.get("flag") == Value::from(1) {
                reader.get("a");
            } else {
                reader.get("b");
            }
        });
        assert_eq!(handle.dependency_count(), 2);

        state.set("flag", 0);
        assert_eq!(handle.run_count(), 2);

        // "a" is no longer read, so writing it does nothing.
        state.set("a", 5);
        assert_eq!(handle.run_count(), 2);
        state.set("b", 5);
        assert_eq!(handle.run_count(), 3);
    }

    #[test]
    fn own_writes_do_not_retrigger() {
        let state = state(&[("count", 0)]);
        let writer = state.clone();
        let handle = effect(move || {
            let next = writer.get("count").as_f64().unwrap_or_default() + 1.0;
            writer.set("count", next);
        });

        assert_eq!(handle.run_count(), 1);
        assert_eq!(state.get("count"), Value::from(1));
    }

    #[test]
    fn allow_recurse_lets_an_effect_trigger_itself() {
        let state = state(&[("count", 0)]);
        let writer = state.clone();
        let handle = effect_with(
            move || {
                let count = writer.get("count").as_f64().unwrap_or_default();
                if count < 3.0 {
                    writer.set("count", count + 1.0);
                }
            },
            EffectOptions::new().allow_recurse(true),
        );

        assert_eq!(state.get("count"), Value::from(3));
        assert_eq!(handle.run_count(), 4);
    }

    #[test]
    fn stop_detaches_and_is_idempotent() {
        let stops = Rc::new(Cell::new(0));
        let stops_clone = stops.clone();
        let state = state(&[("a", 1)]);
        let reader = state.clone();
        let handle = effect_with(
            move || {
                reader.get("a");
            },
            EffectOptions::new().on_stop(move || stops_clone.set(stops_clone.get() + 1)),
        );

        stop(&handle);
        stop(&handle);
        assert_eq!(stops.get(), 1);
        assert!(!handle.is_active());
        assert_eq!(handle.dependency_count(), 0);

        state.set("a", 2);
        assert_eq!(handle.run_count(), 1);
    }

    #[test]
    fn stopped_effect_runs_untracked_or_not_at_all() {
        let plain = effect(|| 1);
        plain.stop();
        assert_eq!(plain.run(), Some(1));
        assert_eq!(plain.dependency_count(), 0);

        let scheduled = effect_with(|| 1, EffectOptions::new().scheduler(|_| {}));
        scheduled.stop();
        assert_eq!(scheduled.run(), None);
    }

    #[test]
    fn debug_hooks_observe_track_and_trigger() {
        RuntimeConfig {
            debug_hooks: true,
            ..RuntimeConfig::default()
        }
        .install();

        let tracked = Rc::new(RefCell::new(Vec::new()));
        let triggered = Rc::new(RefCell::new(Vec::new()));
        let (tracked_clone, triggered_clone) = (tracked.clone(), triggered.clone());
        let object = RawObject::plain();
        let reader = object.clone();

        let _effect = effect_with(
            move || Runtime::track(&reader, TrackOp::Get, &Key::from("a")),
            EffectOptions::new()
                .on_track(move |event| tracked_clone.borrow_mut().push(event.operation))
                .on_trigger(move |event| triggered_clone.borrow_mut().push(event.key.clone())),
        );
        Runtime::trigger(&object, TriggerOp::Set, Some(&Key::from("a")), None, None);

        assert_eq!(
            *tracked.borrow(),
            [Operation::Track(TrackOp::Get), Operation::Track(TrackOp::Get)]
        );
        assert_eq!(*triggered.borrow(), [Some(Key::from("a"))]);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = effect(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        effect1.run();
        assert_eq!(effect2.run_count(), 2);

        effect1.stop();
        assert!(!effect2.is_active());
    }
}
