//! Computed Values
//!
//! A [`Computed`] is a cached derived value built entirely on the effect
//! contract. Its getter runs inside a lazy effect whose scheduler, instead
//! of re-running anything, marks the cache dirty and triggers the
//! computed's own `value` key.
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs on creation. The first [`Computed::get`] evaluates the
//!    getter and caches the result.
//!
//! 2. When a dependency changes, the cache is marked dirty and readers of
//!    the computed are triggered. The getter itself does not run yet.
//!
//! 3. The next `get` re-evaluates. Computed values that are never read
//!    again stay dirty, and no work is wasted on them.
//!
//! Reading a computed inside an effect tracks the computed, not the data
//! behind it, so the effect re-runs exactly when the computed is
//! invalidated.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::{effect_with, Effect, EffectOptions};
use super::runtime::{Runtime, TrackOp, Trackable, TriggerOp};
use crate::value::{Key, ObjectId};

struct ComputedInner<T: 'static> {
    id: ObjectId,
    dirty: Cell<bool>,
    value: RefCell<Option<T>>,
    effect: Effect<T>,
}

/// A lazily evaluated, cached derived value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(2);
/// let source = count.clone();
/// let doubled = Computed::new(move || source.get().as_f64().unwrap_or(0.0) * 2.0);
///
/// assert_eq!(doubled.get(), 4.0);
/// count.set(5);
/// assert_eq!(doubled.get(), 10.0);
/// ```
pub struct Computed<T: 'static>(Rc<ComputedInner<T>>);

impl<T: Clone + 'static> Computed<T> {
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let options = EffectOptions::new().lazy(true).scheduler(move |_| {
                if let Some(inner) = weak.upgrade() {
                    Computed(inner).invalidate();
                }
            });
            ComputedInner {
                id: ObjectId::next(),
                dirty: Cell::new(true),
                value: RefCell::new(None),
                effect: effect_with(getter, options),
            }
        });
        Self(inner)
    }

    fn invalidate(&self) {
        if self.0.dirty.replace(true) {
            return;
        }
        Runtime::trigger(self, TriggerOp::Set, Some(&Key::VALUE), None, None);
    }

    /// The current value, re-evaluated first if a dependency changed.
    ///
    /// # Panics
    ///
    /// Panics if the getter reads its own computed before the first
    /// evaluation has finished.
    pub fn get(&self) -> T {
        if self.0.dirty.get() {
            if let Some(value) = self.0.effect.run() {
                *self.0.value.borrow_mut() = Some(value);
                self.0.dirty.set(false);
            }
        }
        Runtime::track(self, TrackOp::Get, &Key::VALUE);
        self.0
            .value
            .borrow()
            .clone()
            .expect("computed value read re-entrantly during its first evaluation")
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Whether the next `get` will re-evaluate.
    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    /// The lazy effect evaluating the getter.
    pub fn effect(&self) -> &Effect<T> {
        &self.0.effect
    }
}

impl<T: 'static> Trackable for Computed<T> {
    fn target_id(&self) -> ObjectId {
        self.0.id
    }

    fn liveness(&self) -> Weak<dyn Any> {
        let weak: Weak<ComputedInner<T>> = Rc::downgrade(&self.0);
        weak
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.0.id)
            .field("dirty", &self.0.dirty.get())
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
