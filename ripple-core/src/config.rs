//! Runtime Configuration
//!
//! Each thread owns its own reactive runtime, so configuration is installed
//! per thread. Defaults follow the build profile: development builds emit
//! misuse warnings and invoke effect debug hooks, release builds skip both.

use std::cell::RefCell;

use serde::Deserialize;

use crate::error::Result;

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Tunables for the reactive runtime on the current thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emit warnings for misuse such as writing through a readonly proxy.
    pub dev_warnings: bool,

    /// Invoke `on_track` / `on_trigger` effect hooks.
    pub debug_hooks: bool,

    /// Number of live entries in the dependency store or proxy registry
    /// after which entries for dropped targets are swept.
    pub sweep_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dev_warnings: cfg!(debug_assertions),
            debug_hooks: cfg!(debug_assertions),
            sweep_threshold: 64,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Install this configuration for the current thread.
    pub fn install(self) {
        tracing::debug!(config = ?self, "installing runtime configuration");
        CONFIG.with(|config| *config.borrow_mut() = self);
    }

    /// The configuration in effect on the current thread.
    pub fn current() -> Self {
        CONFIG.with(|config| config.borrow().clone())
    }

    pub(crate) fn dev_warnings_enabled() -> bool {
        CONFIG.with(|config| config.borrow().dev_warnings)
    }

    pub(crate) fn debug_hooks_enabled() -> bool {
        CONFIG.with(|config| config.borrow().debug_hooks)
    }

    pub(crate) fn sweep_threshold() -> usize {
        CONFIG.with(|config| config.borrow().sweep_threshold.max(1))
    }
}
