//! Map and set instrumentation.
//!
//! Collections keep their entries outside the property model, so their
//! methods are instrumented directly instead of through the handler traps.
//! Reads track the key they look at, or the iteration marker when they
//! observe the whole collection. A readonly view layered over a mutable
//! proxy delegates to the inner proxy, which does the tracking.

use super::{reactive, readonly, to_raw, Proxy, Target};
use crate::config::RuntimeConfig;
use crate::reactive::{Runtime, TrackOp, TriggerOp};
use crate::value::{has_changed, Key, ObjectKind, RawObject, Value};

const COLLECTIONS: &[ObjectKind] = &[ObjectKind::Map, ObjectKind::Set];

impl Proxy {
    /// Wrap a value read out of the collection according to this proxy's
    /// variant.
    fn wrap_entry(&self, value: Value) -> Value {
        if self.is_shallow() || !value.is_object() {
            value
        } else if self.is_readonly() {
            readonly(value)
        } else {
            reactive(value)
        }
    }

    fn track_raw(&self, op: TrackOp, key: &Key) {
        if let Target::Raw(object) = self.target() {
            if !self.is_readonly() {
                Runtime::track(object, op, key);
            }
        }
    }

    /// The raw collection a write applies to. `None` for readonly proxies
    /// and for targets whose kind is not in `kinds`.
    fn writable_collection(
        &self,
        operation: &str,
        key: Option<&Key>,
        kinds: &[ObjectKind],
    ) -> Option<RawObject> {
        if !kinds.contains(&self.kind()) {
            return None;
        }
        if self.is_readonly() {
            if RuntimeConfig::dev_warnings_enabled() {
                tracing::warn!(
                    target_id = %self.target().id(),
                    key = ?key,
                    "{operation} operation failed: target is readonly"
                );
            }
            return None;
        }
        Some(self.target().raw())
    }

    /// Value stored under `key` in a map, or `Undefined`.
    pub fn collection_get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        let value = match self.target() {
            Target::Proxy(inner) => inner.collection_get(key),
            Target::Raw(object) => {
                self.track_raw(TrackOp::Get, &key);
                object.collection_get(&key).unwrap_or_default()
            }
        };
        self.wrap_entry(value)
    }

    pub fn collection_has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self.target() {
            Target::Proxy(inner) => inner.collection_has(key),
            Target::Raw(object) => {
                self.track_raw(TrackOp::Has, &key);
                object.collection_has(&key)
            }
        }
    }

    /// Number of entries; depends on the shape of the collection.
    pub fn size(&self) -> usize {
        match self.target() {
            Target::Proxy(inner) => inner.size(),
            Target::Raw(object) => {
                self.track_raw(TrackOp::Iterate, &Key::ITERATE);
                object.len()
            }
        }
    }

    /// Keys in insertion order. On a map this depends only on which keys
    /// exist, so replacing a value does not re-run the reader.
    pub fn keys(&self) -> Vec<Key> {
        match self.target() {
            Target::Proxy(inner) => inner.keys(),
            Target::Raw(object) => {
                let marker = if object.kind() == ObjectKind::Map {
                    Key::MAP_KEY_ITERATE
                } else {
                    Key::ITERATE
                };
                self.track_raw(TrackOp::Iterate, &marker);
                object.collection_keys()
            }
        }
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(_, value)| value).collect()
    }

    pub fn entries(&self) -> Vec<(Key, Value)> {
        let entries = match self.target() {
            Target::Proxy(inner) => inner.entries(),
            Target::Raw(object) => {
                self.track_raw(TrackOp::Iterate, &Key::ITERATE);
                object.collection_entries()
            }
        };
        entries
            .into_iter()
            .map(|(key, value)| (key, self.wrap_entry(value)))
            .collect()
    }

    /// Insert into a map. Returns `false` on readonly proxies and on
    /// anything that is not a map.
    pub fn collection_set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let Some(object) = self.writable_collection("set", Some(&key), &[ObjectKind::Map]) else {
            return false;
        };
        let value = to_raw(&value.into());
        let had_key = object.collection_has(&key);
        let old_value = object.collection_set(key.clone(), value.clone());

        if !had_key {
            Runtime::trigger(&object, TriggerOp::Add, Some(&key), Some(&value), None);
        } else if let Some(old_value) = old_value.filter(|old| has_changed(&value, old)) {
            Runtime::trigger(
                &object,
                TriggerOp::Set,
                Some(&key),
                Some(&value),
                Some(&old_value),
            );
        }
        true
    }

    /// Insert into a set. Returns whether the member is new.
    pub fn collection_add(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let Some(object) = self.writable_collection("add", Some(&key), &[ObjectKind::Set]) else {
            return false;
        };
        let added = object.collection_add(key.clone());
        if added {
            let value = Value::from(key.clone());
            Runtime::trigger(&object, TriggerOp::Add, Some(&key), Some(&value), None);
        }
        added
    }

    /// Remove an entry. Returns whether it was present.
    pub fn collection_delete(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let Some(object) = self.writable_collection("delete", Some(&key), COLLECTIONS) else {
            return false;
        };
        let old_value = object.collection_get(&key);
        let removed = object.collection_remove(&key);
        if removed {
            Runtime::trigger(&object, TriggerOp::Delete, Some(&key), None, old_value.as_ref());
        }
        removed
    }

    /// Remove every entry. Returns whether anything was removed.
    pub fn clear(&self) -> bool {
        let Some(object) = self.writable_collection("clear", None, COLLECTIONS) else {
            return false;
        };
        let had_entries = !object.is_empty();
        object.collection_clear();
        if had_entries {
            Runtime::trigger(&object, TriggerOp::Clear, None, None, None);
        }
        had_entries
    }
}
