//! Error types.
//!
//! Reactive operations themselves never fail: writes to readonly proxies are
//! ignored with a warning and untracked targets are no-ops. Errors only
//! surface at the edges, when converting dynamic values into concrete Rust
//! types or when loading configuration.

/// Errors produced at the edges of the reactive system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A dynamic value did not hold the expected type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type that was requested.
        expected: &'static str,
        /// The type the value actually held.
        found: &'static str,
    },

    /// An object was required but a primitive was supplied.
    #[error("value of type {found} is not an object and cannot be proxied")]
    NotAnObject {
        /// The type the value actually held.
        found: &'static str,
    },

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
