//! Subscriber types for the reactive system.
//!
//! A subscriber is anything a dependency set can notify. Every effect is
//! one, whatever its return type; the dependency store only ever sees the
//! type-erased [`EffectRef`].

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::EffectCore;

/// Unique identifier for a subscriber.
///
/// Each effect gets one when created. The dependency store keys its
/// subscriber sets by this ID, which is what makes repeated reads of the
/// same key within one run idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// A computation the dependency store can notify.
pub(crate) trait Subscriber {
    fn core(&self) -> &EffectCore;

    /// Run the computation, discarding its result.
    fn rerun(self: Rc<Self>);
}

/// Type-erased handle to an effect.
///
/// This is what schedulers receive. Dependency sets only hold a weak
/// counterpart, so an `EffectRef` kept past the last [`Effect`] handle keeps
/// the effect alive. Cloning it clones the handle; the effect itself is
/// shared.
///
/// [`Effect`]: super::Effect
#[derive(Clone)]
pub struct EffectRef(pub(crate) Rc<dyn Subscriber>);

impl EffectRef {
    pub fn id(&self) -> SubscriberId {
        self.0.core().id()
    }

    /// Run the effect now, bypassing its scheduler.
    pub fn run(&self) {
        Rc::clone(&self.0).rerun();
    }

    pub fn stop(&self) {
        self.0.core().stop();
    }

    pub fn is_active(&self) -> bool {
        self.0.core().is_active()
    }

    pub(crate) fn core(&self) -> &EffectCore {
        self.0.core()
    }
}

impl PartialEq for EffectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for EffectRef {}

impl fmt::Debug for EffectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRef")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect_with, EffectOptions};
    use std::cell::Cell;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn effect_ref_runs_and_stops_the_shared_effect() {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        let handle = effect_with(
            move || runs_clone.set(runs_clone.get() + 1),
            EffectOptions::new().lazy(true),
        );
        let erased = handle.as_ref();
        assert_eq!(erased.id(), handle.id());

        erased.run();
        assert_eq!(runs.get(), 1);

        erased.stop();
        assert!(!handle.is_active());
    }
}
