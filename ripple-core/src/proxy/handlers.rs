//! Proxy Handlers
//!
//! The interception logic behind every proxy operation, one handler per
//! variant. Handlers receive the proxy's target and the original receiver
//! explicitly; once their own bookkeeping is done they fall back to
//! [`reflect`].

use super::{readonly, reactive, reflect, to_raw, Receiver, Target, Variant};
use crate::config::RuntimeConfig;
use crate::reactive::{Runtime, TrackOp, TriggerOp};
use crate::value::{has_changed, Key, ObjectKind, Value};

/// The operations a proxy intercepts.
pub(crate) trait ProxyHandler {
    fn get(&self, target: &Target, key: &Key, receiver: &Receiver) -> Value;

    fn set(&self, target: &Target, key: &Key, value: Value, receiver: &Receiver) -> bool;

    fn has(&self, target: &Target, key: &Key) -> bool;

    fn delete_property(&self, target: &Target, key: &Key) -> bool;

    fn own_keys(&self, target: &Target) -> Vec<Key>;
}

static MUTABLE: MutableHandler = MutableHandler { shallow: false };
static SHALLOW: MutableHandler = MutableHandler { shallow: true };
static READONLY: ReadonlyHandler = ReadonlyHandler { shallow: false };
static SHALLOW_READONLY: ReadonlyHandler = ReadonlyHandler { shallow: true };

pub(crate) fn for_variant(variant: Variant) -> &'static dyn ProxyHandler {
    match (variant.readonly, variant.shallow) {
        (false, false) => &MUTABLE,
        (false, true) => &SHALLOW,
        (true, false) => &READONLY,
        (true, true) => &SHALLOW_READONLY,
    }
}

/// Shared read path for all four variants.
fn get(variant: Variant, target: &Target, key: &Key, receiver: &Receiver) -> Value {
    if *key == Key::IS_REACTIVE {
        return Value::Bool(!variant.readonly);
    }
    if *key == Key::IS_READONLY {
        return Value::Bool(variant.readonly);
    }
    if *key == Key::RAW && receiver.is_proxy_of(target, variant) {
        return target.to_value();
    }

    let result = reflect::get(target, key, receiver);

    if key.is_well_known_symbol() || *key == Key::PROTO || *key == Key::IS_REF {
        return result;
    }

    if !variant.readonly {
        if let Target::Raw(object) = target {
            Runtime::track(object, TrackOp::Get, key);
        }
    }

    if variant.shallow {
        return result;
    }

    if let Value::Ref(cell) = &result {
        // Indexing an array of refs hands back the ref itself.
        let keep_cell = target.kind() == ObjectKind::Array && key.as_index().is_some();
        return if keep_cell { result } else { cell.get() };
    }

    if result.is_object() {
        return if variant.readonly {
            readonly(result)
        } else {
            reactive(result)
        };
    }

    result
}

fn warn_readonly(operation: &str, target: &Target, key: &Key) {
    if RuntimeConfig::dev_warnings_enabled() {
        tracing::warn!(
            target_id = %target.id(),
            key = %key,
            "{operation} operation failed: target is readonly"
        );
    }
}

pub(crate) struct MutableHandler {
    shallow: bool,
}

impl MutableHandler {
    fn variant(&self) -> Variant {
        Variant {
            readonly: false,
            shallow: self.shallow,
        }
    }
}

impl ProxyHandler for MutableHandler {
    fn get(&self, target: &Target, key: &Key, receiver: &Receiver) -> Value {
        get(self.variant(), target, key, receiver)
    }

    fn set(&self, target: &Target, key: &Key, value: Value, receiver: &Receiver) -> bool {
        let Target::Raw(object) = target else {
            return reflect::set(target, key, value, receiver);
        };

        let old_value = object.get(key);
        let mut value = value;
        if !self.shallow {
            value = to_raw(&value);
            if !object.is_array() {
                if let (Value::Ref(cell), false) = (&old_value, matches!(value, Value::Ref(_))) {
                    cell.set(value);
                    return true;
                }
            }
        }

        let had_key = match key.as_index() {
            Some(index) if object.is_array() => index < object.len(),
            _ => object.has_own(key),
        };
        let result = reflect::set(target, key, value.clone(), receiver);

        // Writes that reached this target through a prototype chain belong
        // to the receiver; only the receiver's own proxy triggers.
        if result && receiver.to_raw() == *object {
            if !had_key {
                Runtime::trigger(object, TriggerOp::Add, Some(key), Some(&value), None);
            } else if has_changed(&value, &old_value) {
                Runtime::trigger(
                    object,
                    TriggerOp::Set,
                    Some(key),
                    Some(&value),
                    Some(&old_value),
                );
            }
        }
        result
    }

    fn has(&self, target: &Target, key: &Key) -> bool {
        let result = reflect::has(target, key);
        if !key.is_well_known_symbol() {
            if let Target::Raw(object) = target {
                Runtime::track(object, TrackOp::Has, key);
            }
        }
        result
    }

    fn delete_property(&self, target: &Target, key: &Key) -> bool {
        let Target::Raw(object) = target else {
            return reflect::delete(target, key);
        };

        let had_key = object.has_own(key);
        let old_value = object.get(key);
        let result = reflect::delete(target, key);
        if result && had_key {
            Runtime::trigger(object, TriggerOp::Delete, Some(key), None, Some(&old_value));
        }
        result
    }

    fn own_keys(&self, target: &Target) -> Vec<Key> {
        if let Target::Raw(object) = target {
            let marker = if object.is_array() {
                Key::LENGTH
            } else {
                Key::ITERATE
            };
            Runtime::track(object, TrackOp::Iterate, &marker);
        }
        reflect::own_keys(target)
    }
}

pub(crate) struct ReadonlyHandler {
    shallow: bool,
}

impl ProxyHandler for ReadonlyHandler {
    fn get(&self, target: &Target, key: &Key, receiver: &Receiver) -> Value {
        let variant = Variant {
            readonly: true,
            shallow: self.shallow,
        };
        get(variant, target, key, receiver)
    }

    fn set(&self, target: &Target, key: &Key, _value: Value, _receiver: &Receiver) -> bool {
        warn_readonly("set", target, key);
        true
    }

    fn has(&self, target: &Target, key: &Key) -> bool {
        reflect::has(target, key)
    }

    fn delete_property(&self, target: &Target, key: &Key) -> bool {
        warn_readonly("delete", target, key);
        true
    }

    fn own_keys(&self, target: &Target) -> Vec<Key> {
        reflect::own_keys(target)
    }
}
