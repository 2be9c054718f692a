//! Proxy Registry
//!
//! One identity map per variant from target to proxy, so wrapping the same
//! target twice hands back the same proxy. Entries hold the proxy weakly:
//! once every handle to a proxy is gone the entry is dead, and dead entries
//! are swept whenever the registry grows past the configured threshold.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use super::{Proxy, ProxyInner, Variant};
use crate::config::RuntimeConfig;
use crate::value::ObjectId;

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

#[derive(Default)]
struct Registry {
    mutable: HashMap<ObjectId, Weak<ProxyInner>>,
    shallow: HashMap<ObjectId, Weak<ProxyInner>>,
    readonly: HashMap<ObjectId, Weak<ProxyInner>>,
    shallow_readonly: HashMap<ObjectId, Weak<ProxyInner>>,
    next_sweep: usize,
}

impl Registry {
    fn map(&self, variant: Variant) -> &HashMap<ObjectId, Weak<ProxyInner>> {
        match (variant.readonly, variant.shallow) {
            (false, false) => &self.mutable,
            (false, true) => &self.shallow,
            (true, false) => &self.readonly,
            (true, true) => &self.shallow_readonly,
        }
    }

    fn map_mut(&mut self, variant: Variant) -> &mut HashMap<ObjectId, Weak<ProxyInner>> {
        match (variant.readonly, variant.shallow) {
            (false, false) => &mut self.mutable,
            (false, true) => &mut self.shallow,
            (true, false) => &mut self.readonly,
            (true, true) => &mut self.shallow_readonly,
        }
    }

    fn len(&self) -> usize {
        self.mutable.len() + self.shallow.len() + self.readonly.len() + self.shallow_readonly.len()
    }

    fn sweep(&mut self) {
        for map in [
            &mut self.mutable,
            &mut self.shallow,
            &mut self.readonly,
            &mut self.shallow_readonly,
        ] {
            map.retain(|_, proxy| proxy.strong_count() > 0);
        }
    }
}

/// The live proxy of `variant` over the target with id `target`.
pub(crate) fn lookup(variant: Variant, target: ObjectId) -> Option<Proxy> {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .map(variant)
            .get(&target)
            .and_then(Weak::upgrade)
            .map(Proxy::from_inner)
    })
}

pub(crate) fn insert(proxy: &Proxy) {
    let threshold = RuntimeConfig::sweep_threshold();
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if registry.len() >= registry.next_sweep.max(threshold) {
            registry.sweep();
            registry.next_sweep = registry.len() * 2;
            tracing::trace!(live = registry.len(), "swept proxy registry");
        }
        registry
            .map_mut(proxy.variant())
            .insert(proxy.target().id(), proxy.downgrade());
    });
}

/// Number of registry entries, live or not yet swept.
pub(crate) fn entry_count() -> usize {
    REGISTRY.with(|registry| registry.borrow().len())
}
