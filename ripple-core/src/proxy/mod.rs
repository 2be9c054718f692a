//! Reactive Proxies
//!
//! A [`Proxy`] wraps exactly one target and routes every property access
//! through a handler. The handler decides what to track on reads and what
//! to trigger on writes; the data itself stays in the caller's
//! [`RawObject`].
//!
//! # Variants
//!
//! | factory              | tracks reads | accepts writes | wraps nested values |
//! |----------------------|--------------|----------------|---------------------|
//! | [`reactive`]         | yes          | yes            | as reactive         |
//! | [`shallow_reactive`] | yes          | yes            | no                  |
//! | [`readonly`]         | no           | no (warns)     | as readonly         |
//! | [`shallow_readonly`] | no           | no (warns)     | no                  |
//!
//! Nested objects are wrapped lazily, only when a read returns them.
//!
//! # Identity
//!
//! Wrapping is referentially stable: the same target wrapped twice with the
//! same variant yields the same proxy, and wrapping a proxy again returns
//! it unchanged. The one exception is [`readonly`] over a mutable proxy,
//! which layers a readonly proxy on top; reads through it still track
//! through the inner proxy.

mod array;
mod collection;
mod handlers;
pub(crate) mod reflect;
mod registry;

use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::RuntimeConfig;
use crate::value::{Key, ObjectId, ObjectKind, RawObject, Value};
use handlers::ProxyHandler;

/// Policy flags of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variant {
    pub readonly: bool,
    pub shallow: bool,
}

impl Variant {
    pub const MUTABLE: Variant = Variant {
        readonly: false,
        shallow: false,
    };
    pub const SHALLOW: Variant = Variant {
        readonly: false,
        shallow: true,
    };
    pub const READONLY: Variant = Variant {
        readonly: true,
        shallow: false,
    };
    pub const SHALLOW_READONLY: Variant = Variant {
        readonly: true,
        shallow: true,
    };
}

/// What a proxy wraps: raw data, or (for readonly wrappers) another proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Raw(RawObject),
    Proxy(Proxy),
}

impl Target {
    pub fn id(&self) -> ObjectId {
        match self {
            Target::Raw(object) => object.id(),
            Target::Proxy(proxy) => proxy.id(),
        }
    }

    /// Kind of the underlying raw object, seen through any stacked proxies.
    pub fn kind(&self) -> ObjectKind {
        self.raw().kind()
    }

    pub fn raw(&self) -> RawObject {
        match self {
            Target::Raw(object) => object.clone(),
            Target::Proxy(proxy) => proxy.target().raw(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Target::Raw(object) => Value::Object(object.clone()),
            Target::Proxy(proxy) => Value::Proxy(proxy.clone()),
        }
    }
}

/// The object an access was originally made on.
///
/// When a read or write walks up a prototype chain into a proxy, that
/// proxy's handler sees the original receiver rather than itself.
#[derive(Debug, Clone)]
pub(crate) enum Receiver {
    Proxy(Proxy),
    Raw(RawObject),
}

impl Receiver {
    /// Raw object behind the receiver, through any stacked proxies.
    pub(crate) fn to_raw(&self) -> RawObject {
        match self {
            Receiver::Proxy(proxy) => proxy.target().raw(),
            Receiver::Raw(object) => object.clone(),
        }
    }

    /// Whether the receiver is the registered `variant` proxy of `target`.
    pub(crate) fn is_proxy_of(&self, target: &Target, variant: Variant) -> bool {
        match self {
            Receiver::Proxy(proxy) => {
                registry::lookup(variant, target.id()).is_some_and(|existing| existing == *proxy)
            }
            Receiver::Raw(_) => false,
        }
    }
}

pub(crate) struct ProxyInner {
    id: ObjectId,
    target: Target,
    variant: Variant,
}

/// An intercepting wrapper around one target.
#[derive(Clone)]
pub struct Proxy(Rc<ProxyInner>);

impl Proxy {
    fn new(target: Target, variant: Variant) -> Self {
        Self(Rc::new(ProxyInner {
            id: ObjectId::next(),
            target,
            variant,
        }))
    }

    pub(crate) fn from_inner(inner: Rc<ProxyInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<ProxyInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn handler(&self) -> &'static dyn ProxyHandler {
        handlers::for_variant(self.0.variant)
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn target(&self) -> &Target {
        &self.0.target
    }

    pub fn variant(&self) -> Variant {
        self.0.variant
    }

    pub fn is_readonly(&self) -> bool {
        self.0.variant.readonly
    }

    pub fn is_shallow(&self) -> bool {
        self.0.variant.shallow
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.target.kind()
    }

    fn receiver(&self) -> Receiver {
        Receiver::Proxy(self.clone())
    }

    /// Read a property through the handler.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.handler().get(self.target(), &key.into(), &self.receiver())
    }

    /// Write a property through the handler. Readonly proxies ignore the
    /// write and still report success.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        self.handler()
            .set(self.target(), &key.into(), value.into(), &self.receiver())
    }

    /// Membership test through the handler; trackable like a read.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        self.handler().has(self.target(), &key.into())
    }

    pub fn delete(&self, key: impl Into<Key>) -> bool {
        self.handler().delete_property(self.target(), &key.into())
    }

    /// Enumerate own keys, depending on the object's shape.
    pub fn own_keys(&self) -> Vec<Key> {
        self.handler().own_keys(self.target())
    }

    /// Array length read through the handler. Zero for anything that is not
    /// an array, whatever its `length` property holds.
    pub fn len(&self) -> usize {
        if self.kind() != ObjectKind::Array {
            return 0;
        }
        self.get(Key::LENGTH)
            .as_f64()
            .map_or(0, |length| length as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Proxy {}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("id", &self.0.id)
            .field("variant", &self.0.variant)
            .field("target", &self.0.target)
            .finish()
    }
}

fn create_proxy(value: Value, variant: Variant) -> Value {
    let target = match &value {
        Value::Object(object) => Target::Raw(object.clone()),
        Value::Proxy(proxy) => Target::Proxy(proxy.clone()),
        other => {
            if RuntimeConfig::dev_warnings_enabled() {
                tracing::warn!(value = ?other, "value cannot be made reactive");
            }
            return value;
        }
    };

    // Already a proxy: hand it back, unless a readonly view of a mutable
    // proxy was asked for.
    if flag(&value, &Key::RAW).is_object()
        && !(variant.readonly && flag(&value, &Key::IS_REACTIVE).is_true())
    {
        return value;
    }

    if let Some(existing) = registry::lookup(variant, target.id()) {
        return Value::Proxy(existing);
    }

    let proxy = Proxy::new(target, variant);
    registry::insert(&proxy);
    tracing::trace!(proxy = %proxy.id(), target = %proxy.target().id(), ?variant, "created proxy");
    Value::Proxy(proxy)
}

/// Read a reserved key the way any other property would be read, so the
/// answer respects prototype chains and receivers.
fn flag(value: &Value, key: &Key) -> Value {
    match value {
        Value::Proxy(proxy) => proxy.get(key),
        Value::Object(object) => object.get(key),
        _ => Value::Undefined,
    }
}

/// Deeply reactive proxy over an object. Primitives are returned unchanged.
pub fn reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    // A readonly proxy is never re-wrapped as mutable.
    if is_readonly(&value) {
        return value;
    }
    create_proxy(value, Variant::MUTABLE)
}

/// Reactive proxy that tracks only the outermost level.
pub fn shallow_reactive(value: impl Into<Value>) -> Value {
    create_proxy(value.into(), Variant::SHALLOW)
}

/// Deeply readonly proxy. Writes are ignored with a development warning.
pub fn readonly(value: impl Into<Value>) -> Value {
    create_proxy(value.into(), Variant::READONLY)
}

/// Readonly only at the outermost level; nested values come back as stored.
pub fn shallow_readonly(value: impl Into<Value>) -> Value {
    create_proxy(value.into(), Variant::SHALLOW_READONLY)
}

/// Whether the value is a mutable proxy, or a readonly view of one.
pub fn is_reactive(value: &Value) -> bool {
    if is_readonly(value) {
        return is_reactive(&flag(value, &Key::RAW));
    }
    flag(value, &Key::IS_REACTIVE).is_true()
}

pub fn is_readonly(value: &Value) -> bool {
    flag(value, &Key::IS_READONLY).is_true()
}

pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// The raw value behind any number of stacked proxies.
pub fn to_raw(value: &Value) -> Value {
    let raw = flag(value, &Key::RAW);
    if raw.is_object() {
        to_raw(&raw)
    } else {
        value.clone()
    }
}

/// Number of proxy registry entries on this thread.
pub fn registry_size() -> usize {
    registry::entry_count()
}
