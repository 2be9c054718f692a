//! Reactive Runtime
//!
//! The runtime owns the dependency store: for every tracked target, a map
//! from key to the set of effects that read it. It connects the proxy layer
//! to effects through two entry points.
//!
//! 1. [`Runtime::track`] is called on every intercepted read. If an effect
//!    is running and tracking is enabled, the effect joins the dependency
//!    set for `(target, key)` and remembers the set so it can leave it
//!    again before its next run.
//!
//! 2. [`Runtime::trigger`] is called after every effective write. It picks
//!    the dependency sets the write can affect, merges them into one list
//!    of effects, and runs each exactly once (or hands it to its
//!    scheduler).
//!
//! # Lifetimes
//!
//! The store never keeps a target or an effect alive. Each entry carries a
//! weak handle to its target, and dependency sets hold weak handles to
//! their effects, so an effect lives exactly as long as its [`Effect`]
//! handles. Entries whose target has been dropped, and dependency sets left
//! without a live subscriber, are swept when the store grows past the
//! configured threshold, or on [`Runtime::sweep`].
//!
//! [`Effect`]: super::Effect

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::{self, ReactiveContext};
use super::effect::DebuggerEvent;
use super::subscriber::{EffectRef, Subscriber, SubscriberId};
use crate::config::RuntimeConfig;
use crate::value::{Key, ObjectId, ObjectKind, RawObject, Value};

thread_local! {
    static STORE: RefCell<Store> = RefCell::new(Store::default());
}

/// Kind of read being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackOp {
    Get,
    Has,
    Iterate,
}

/// Kind of write being propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    Set,
    Add,
    Delete,
    Clear,
}

/// Either side of the dependency graph, as reported to debug hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Track(TrackOp),
    Trigger(TriggerOp),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Track(TrackOp::Get) => "get",
            Operation::Track(TrackOp::Has) => "has",
            Operation::Track(TrackOp::Iterate) => "iterate",
            Operation::Trigger(TriggerOp::Set) => "set",
            Operation::Trigger(TriggerOp::Add) => "add",
            Operation::Trigger(TriggerOp::Delete) => "delete",
            Operation::Trigger(TriggerOp::Clear) => "clear",
        };
        f.write_str(name)
    }
}

/// Anything that can own dependency sets.
///
/// Raw objects are the common case; reference cells and computed values
/// carry their own identity and a single `value` key.
pub trait Trackable {
    fn target_id(&self) -> ObjectId;

    /// Shape of the target, which decides the trigger policy.
    fn target_kind(&self) -> ObjectKind {
        ObjectKind::Plain
    }

    /// A handle that stops upgrading once the target is gone.
    fn liveness(&self) -> Weak<dyn Any>;
}

impl Trackable for RawObject {
    fn target_id(&self) -> ObjectId {
        self.id()
    }

    fn target_kind(&self) -> ObjectKind {
        self.kind()
    }

    fn liveness(&self) -> Weak<dyn Any> {
        RawObject::liveness(self)
    }
}

/// The effects subscribed to one `(target, key)` pair.
#[derive(Default)]
pub(crate) struct DepSet {
    subscribers: RefCell<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

impl DepSet {
    /// Add the effect; returns `false` if it was already a member.
    fn insert(&self, effect: &EffectRef) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), Rc::downgrade(&effect.0));
        true
    }

    pub(crate) fn remove(&self, id: SubscriberId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }

    /// Live subscribers.
    fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .values()
            .filter(|effect| effect.strong_count() > 0)
            .count()
    }

    /// Forget effects that have been dropped; returns whether any remain.
    fn prune(&self) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|_, effect| effect.strong_count() > 0);
        !subscribers.is_empty()
    }

    /// The live subscribers, pruning dead ones along the way.
    fn snapshot(&self) -> Vec<EffectRef> {
        let live: Vec<EffectRef> = self
            .subscribers
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .map(EffectRef)
            .collect();
        if live.len() != self.subscribers.borrow().len() {
            self.prune();
        }
        live
    }
}

struct TargetDeps {
    liveness: Weak<dyn Any>,
    deps: IndexMap<Key, Rc<DepSet>>,
}

impl TargetDeps {
    fn is_live(&self) -> bool {
        self.liveness.strong_count() > 0
    }

    fn push(&self, selected: &mut SmallVec<[Rc<DepSet>; 4]>, key: &Key) {
        if let Some(dep) = self.deps.get(key) {
            selected.push(Rc::clone(dep));
        }
    }

    /// The dependency sets a write of `op` on `key` can affect.
    fn select(
        &self,
        op: TriggerOp,
        kind: ObjectKind,
        key: Option<&Key>,
        new_value: Option<&Value>,
    ) -> SmallVec<[Rc<DepSet>; 4]> {
        let mut selected = SmallVec::new();

        if op == TriggerOp::Clear {
            selected.extend(self.deps.values().cloned());
            return selected;
        }

        if kind == ObjectKind::Array && key == Some(&Key::LENGTH) {
            let new_length = new_value.and_then(Value::as_f64).unwrap_or(0.0);
            for (tracked, dep) in &self.deps {
                let truncated = tracked
                    .as_index()
                    .is_some_and(|index| index as f64 >= new_length);
                if *tracked == Key::LENGTH || truncated {
                    selected.push(Rc::clone(dep));
                }
            }
            return selected;
        }

        if let Some(key) = key {
            self.push(&mut selected, key);
        }

        match op {
            TriggerOp::Add | TriggerOp::Delete if kind != ObjectKind::Array => {
                self.push(&mut selected, &Key::ITERATE);
                if kind == ObjectKind::Map {
                    self.push(&mut selected, &Key::MAP_KEY_ITERATE);
                }
            }
            TriggerOp::Add if key.and_then(Key::as_index).is_some() => {
                self.push(&mut selected, &Key::LENGTH);
            }
            TriggerOp::Set if kind == ObjectKind::Map => {
                self.push(&mut selected, &Key::ITERATE);
            }
            _ => {}
        }
        selected
    }
}

#[derive(Default)]
struct Store {
    targets: HashMap<ObjectId, TargetDeps>,
    next_sweep: usize,
}

impl Store {
    /// Fetch or create the dependency set for `(target, key)`. Entries for
    /// dead targets removed along the way are handed back so they can be
    /// dropped outside the store borrow.
    fn dep_for(&mut self, target: &dyn Trackable, key: &Key) -> (Rc<DepSet>, Vec<TargetDeps>) {
        let id = target.target_id();
        let mut swept = Vec::new();
        if !self.targets.contains_key(&id) {
            let threshold = RuntimeConfig::sweep_threshold();
            if self.targets.len() >= self.next_sweep.max(threshold) {
                swept = self.sweep();
                self.next_sweep = self.targets.len() * 2;
            }
        }

        let entry = self.targets.entry(id).or_insert_with(|| TargetDeps {
            liveness: target.liveness(),
            deps: IndexMap::new(),
        });
        let dep = entry.deps.entry(key.clone()).or_default();
        (Rc::clone(dep), swept)
    }

    /// Remove entries of dead targets, and dependency sets no live effect
    /// subscribes to. Targets left without any set go as well.
    fn sweep(&mut self) -> Vec<TargetDeps> {
        for entry in self.targets.values_mut() {
            if entry.is_live() {
                entry.deps.retain(|_, dep| dep.prune());
            }
        }
        let dead: Vec<ObjectId> = self
            .targets
            .iter()
            .filter(|(_, entry)| !entry.is_live() || entry.deps.is_empty())
            .map(|(id, _)| *id)
            .collect();
        let swept: Vec<TargetDeps> = dead
            .iter()
            .filter_map(|id| self.targets.remove(id))
            .collect();
        tracing::trace!(
            swept = swept.len(),
            live = self.targets.len(),
            "swept dependency store"
        );
        swept
    }
}

/// The reactive runtime of the current thread.
pub struct Runtime;

impl Runtime {
    /// Record that the running effect read `key` on `target`.
    ///
    /// A no-op when no effect is running or tracking is paused.
    pub fn track(target: &dyn Trackable, op: TrackOp, key: &Key) {
        if !context::should_track() {
            return;
        }
        let Some(effect) = ReactiveContext::active_effect() else {
            return;
        };

        let (dep, swept) = STORE.with(|store| store.borrow_mut().dep_for(target, key));
        drop(swept);

        if !dep.insert(&effect) {
            return;
        }
        effect.core().add_dep(&dep);

        tracing::trace!(
            effect = %effect.id(),
            target = %target.target_id(),
            %key,
            op = %Operation::Track(op),
            "track"
        );
        if RuntimeConfig::debug_hooks_enabled() {
            effect.core().on_track(&DebuggerEvent {
                effect: effect.id(),
                target: target.target_id(),
                operation: Operation::Track(op),
                key: Some(key.clone()),
                new_value: None,
                old_value: None,
            });
        }
    }

    /// Run every effect affected by a write of `op` on `target`.
    ///
    /// A target that was never tracked has nothing to notify. The running
    /// effect is skipped unless it allows recursion.
    pub fn trigger(
        target: &dyn Trackable,
        op: TriggerOp,
        key: Option<&Key>,
        new_value: Option<&Value>,
        old_value: Option<&Value>,
    ) {
        let target_id = target.target_id();
        let kind = target.target_kind();
        let deps = STORE.with(|store| {
            store
                .borrow()
                .targets
                .get(&target_id)
                .map(|entry| entry.select(op, kind, key, new_value))
                .unwrap_or_default()
        });
        if deps.is_empty() {
            return;
        }

        let active = ReactiveContext::current_subscriber();
        let mut effects: IndexMap<SubscriberId, EffectRef> = IndexMap::new();
        for dep in &deps {
            for effect in dep.snapshot() {
                if Some(effect.id()) != active || effect.core().allow_recurse() {
                    effects.entry(effect.id()).or_insert(effect);
                }
            }
        }

        tracing::trace!(
            target = %target_id,
            key = ?key,
            op = %Operation::Trigger(op),
            effects = effects.len(),
            "trigger"
        );

        for effect in effects.into_values() {
            // Stopped by an earlier effect in this same cascade.
            if !effect.is_active() {
                continue;
            }
            if RuntimeConfig::debug_hooks_enabled() {
                effect.core().on_trigger(&DebuggerEvent {
                    effect: effect.id(),
                    target: target_id,
                    operation: Operation::Trigger(op),
                    key: key.cloned(),
                    new_value: new_value.cloned(),
                    old_value: old_value.cloned(),
                });
            }
            match effect.core().scheduler() {
                Some(scheduler) => scheduler(effect),
                None => effect.run(),
            }
        }
    }

    /// Number of effects subscribed to `(target, key)`.
    pub fn subscriber_count(target: &dyn Trackable, key: &Key) -> usize {
        STORE.with(|store| {
            store
                .borrow()
                .targets
                .get(&target.target_id())
                .and_then(|entry| entry.deps.get(key))
                .map_or(0, |dep| dep.len())
        })
    }

    /// Number of targets with an entry in the store, live or not yet swept.
    pub fn tracked_targets() -> usize {
        STORE.with(|store| store.borrow().targets.len())
    }

    /// Drop the entries of every target that no longer exists, and every
    /// dependency set whose effects have all been dropped.
    pub fn sweep() {
        let swept = STORE.with(|store| store.borrow_mut().sweep());
        drop(swept);
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if a read right now would be tracked.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_tracking()
    }
}
