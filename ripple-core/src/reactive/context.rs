//! Reactive Context
//!
//! The reactive context tracks which effect is currently running and
//! whether reads should be tracked at all. Both are thread-local stacks:
//!
//! - the effect stack, whose top is the active effect. Nested runs push on
//!   top of it, so once an inner effect finishes the outer one is current
//!   again.
//! - the tracking stack, which saves the enabled flag around every pause
//!   or enable so that each reset restores exactly the state before it.
//!
//! [`ReactiveContext`] and [`TrackingPause`] are guards. They restore the
//! stacks in `Drop`, which keeps the context consistent even when an effect
//! panics and the panic is caught further up.

use std::cell::RefCell;

use super::subscriber::{EffectRef, SubscriberId};

thread_local! {
    static EFFECT_STACK: RefCell<Vec<EffectRef>> = RefCell::new(Vec::new());
    static TRACKING: RefCell<TrackingState> = RefCell::new(TrackingState::default());
}

struct TrackingState {
    enabled: bool,
    saved: Vec<bool>,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            enabled: true,
            saved: Vec::new(),
        }
    }
}

/// Guard for one effect run.
///
/// Entering enables tracking and pushes the effect; dropping pops it and
/// restores the previous tracking state.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    pub(crate) fn enter(effect: EffectRef) -> Self {
        let subscriber_id = effect.id();
        enable_tracking();
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(effect));
        Self { subscriber_id }
    }

    /// Check if an effect is running.
    pub fn is_active() -> bool {
        EFFECT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The ID of the innermost running effect, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        EFFECT_STACK.with(|stack| stack.borrow().last().map(EffectRef::id))
    }

    pub(crate) fn active_effect() -> Option<EffectRef> {
        EFFECT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Whether the effect is anywhere on the stack.
    pub(crate) fn contains(id: SubscriberId) -> bool {
        EFFECT_STACK.with(|stack| stack.borrow().iter().any(|effect| effect.id() == id))
    }

    /// Whether a read right now would be recorded.
    pub fn is_tracking() -> bool {
        TRACKING.with(|tracking| tracking.borrow().enabled) && Self::is_active()
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = EFFECT_STACK.with(|stack| stack.borrow_mut().pop());
        reset_tracking();

        if let Some(effect) = &popped {
            debug_assert_eq!(
                effect.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                effect.id()
            );
        }
        // The popped handle may be the last one keeping its effect alive;
        // release it only after the stack borrow has ended.
        drop(popped);
    }
}

/// Suspend tracking until the matching [`reset_tracking`].
pub fn pause_tracking() {
    TRACKING.with(|tracking| {
        let mut tracking = tracking.borrow_mut();
        let previous = tracking.enabled;
        tracking.saved.push(previous);
        tracking.enabled = false;
    });
}

/// Resume tracking until the matching [`reset_tracking`].
pub fn enable_tracking() {
    TRACKING.with(|tracking| {
        let mut tracking = tracking.borrow_mut();
        let previous = tracking.enabled;
        tracking.saved.push(previous);
        tracking.enabled = true;
    });
}

/// Restore the tracking state saved by the last pause or enable.
pub fn reset_tracking() {
    TRACKING.with(|tracking| {
        let mut tracking = tracking.borrow_mut();
        tracking.enabled = tracking.saved.pop().unwrap_or(true);
    });
}

pub(crate) fn should_track() -> bool {
    TRACKING.with(|tracking| tracking.borrow().enabled)
}

/// Scoped [`pause_tracking`]; resets when dropped.
pub struct TrackingPause(());

impl TrackingPause {
    pub fn new() -> Self {
        pause_tracking();
        Self(())
    }
}

impl Default for TrackingPause {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrackingPause {
    fn drop(&mut self) {
        reset_tracking();
    }
}

/// Run `f` without recording any of its reads.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _pause = TrackingPause::new();
    f()
}
