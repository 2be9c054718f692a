//! Ripple Core
//!
//! This crate provides fine-grained dependency tracking over plain,
//! dynamically-shaped object graphs. It implements:
//!
//! - Reactive proxies over objects, arrays, maps and sets, in mutable,
//!   readonly and shallow variants
//! - A dependency store recording which effect read which key
//! - Effects that re-run when data they read changes
//! - Reference cells and lazily cached computed values
//!
//! All state is per thread. Nothing here is `Send`; every thread that uses
//! the crate gets its own independent runtime.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the dynamic data model (`Value`, `Key`, `RawObject`)
//! - `proxy`: proxy factories, handlers and array/collection instrumentation
//! - `reactive`: dependency store, effects, refs and computed values
//! - `config`: per-thread runtime configuration
//! - `error`: errors raised at the edges of the system
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::{effect, reactive, RawObject};
//!
//! let state = reactive(RawObject::from_entries([("count", 0)]));
//! let proxy = state.as_proxy().unwrap().clone();
//!
//! let reader = proxy.clone();
//! let _log = effect(move || println!("Count: {:?}", reader.get("count")));
//!
//! proxy.set("count", 5);
//! // Effect automatically runs, prints: "Count: 5"
//! ```

pub mod config;
pub mod error;
pub mod proxy;
pub mod reactive;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use proxy::{
    is_proxy, is_reactive, is_readonly, reactive, readonly, shallow_reactive, shallow_readonly,
    to_raw, Proxy, Variant,
};
pub use reactive::{
    effect, effect_with, is_ref, stop, unref, untracked, Computed, Effect, EffectOptions,
    EffectRef, Ref,
};
pub use value::{has_changed, Key, ObjectId, ObjectKind, RawObject, Symbol, Value};
