//! Reactive Primitives
//!
//! This module implements the dependency graph behind the proxies: the
//! dependency store, effects, reference cells and computed values.
//!
//! # Concepts
//!
//! ## Effects
//!
//! An [`Effect`] is a computation that runs once on creation and again
//! whenever data it read changes. Reads are recorded automatically: every
//! proxy read, [`Ref::get`] and [`Computed::get`] made while an effect runs
//! subscribes that effect to what was read.
//!
//! ## Reference cells
//!
//! A [`Ref`] is a reactive box around a single value, for state that is
//! not a property of an object.
//!
//! ## Computed values
//!
//! A [`Computed`] caches a derived value and re-evaluates it only when read
//! after one of its dependencies changed.
//!
//! # Implementation Notes
//!
//! The current effect and the tracking-enabled flag live in thread-local
//! stacks (see [`ReactiveContext`]), so nested runs restore the outer
//! effect on the way out. All state is per thread; nothing here is `Send`.

mod computed;
mod context;
mod effect;
mod reference;
mod runtime;
mod subscriber;

pub use computed::Computed;
pub use context::{
    enable_tracking, pause_tracking, reset_tracking, untracked, ReactiveContext, TrackingPause,
};
pub use effect::{
    effect, effect_with, stop, DebugHook, DebuggerEvent, Effect, EffectOptions, Scheduler,
};
pub use reference::{is_ref, unref, Ref};
pub use runtime::{Operation, Runtime, TrackOp, Trackable, TriggerOp};
pub use subscriber::{EffectRef, SubscriberId};
