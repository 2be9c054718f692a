//! Default object operations.
//!
//! These are the operations a handler falls back to once its own
//! interception logic is done. On a raw target they act on the data
//! directly; on a proxy target they dispatch into that proxy's handler,
//! which is how a readonly wrapper layered over a mutable proxy still
//! tracks through the inner one.

use super::{Receiver, Target};
use crate::value::{Key, Value};

/// Property read. Walks the prototype chain of plain objects, handing the
/// original `receiver` to any proxy found there.
pub(crate) fn get(target: &Target, key: &Key, receiver: &Receiver) -> Value {
    match target {
        Target::Proxy(proxy) => proxy.handler().get(proxy.target(), key, receiver),
        Target::Raw(object) => {
            if let Some(value) = object.get_own(key) {
                return value;
            }
            match object.proto() {
                Some(Value::Proxy(proto)) => get(&Target::Proxy(proto), key, receiver),
                Some(Value::Object(proto)) => get(&Target::Raw(proto), key, receiver),
                _ => Value::Undefined,
            }
        }
    }
}

/// Property write. A key the target does not own is offered to its
/// prototype first; wherever the write lands, the property is defined on
/// the receiver.
pub(crate) fn set(target: &Target, key: &Key, value: Value, receiver: &Receiver) -> bool {
    match target {
        Target::Proxy(proxy) => proxy.handler().set(proxy.target(), key, value, receiver),
        Target::Raw(object) => {
            if !object.has_own(key) {
                match object.proto() {
                    Some(Value::Proxy(proto)) => {
                        return set(&Target::Proxy(proto), key, value, receiver)
                    }
                    Some(Value::Object(proto)) => {
                        return set(&Target::Raw(proto), key, value, receiver)
                    }
                    _ => {}
                }
            }
            receiver.to_raw().define(key, value)
        }
    }
}

pub(crate) fn has(target: &Target, key: &Key) -> bool {
    match target {
        Target::Proxy(proxy) => proxy.handler().has(proxy.target(), key),
        Target::Raw(object) => {
            if object.has_own(key) {
                return true;
            }
            match object.proto() {
                Some(Value::Proxy(proto)) => has(&Target::Proxy(proto), key),
                Some(Value::Object(proto)) => has(&Target::Raw(proto), key),
                _ => false,
            }
        }
    }
}

pub(crate) fn delete(target: &Target, key: &Key) -> bool {
    match target {
        Target::Proxy(proxy) => proxy.handler().delete_property(proxy.target(), key),
        Target::Raw(object) => object.delete_own(key),
    }
}

pub(crate) fn own_keys(target: &Target) -> Vec<Key> {
    match target {
        Target::Proxy(proxy) => proxy.handler().own_keys(proxy.target()),
        Target::Raw(object) => object.own_keys(),
    }
}
