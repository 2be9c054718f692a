//! Dynamic Values
//!
//! The reactive layer observes plain, dynamically-shaped data. [`Value`] is
//! the currency every proxy operation takes and returns: primitives by
//! value, objects by shared identity.
//!
//! # Equality
//!
//! Three comparisons are in play and they differ only on `NaN` and signed
//! zero:
//!
//! | comparison          | `NaN` vs `NaN` | `+0` vs `-0` | used by                   |
//! |---------------------|----------------|--------------|---------------------------|
//! | `==` (strict)       | unequal        | equal        | `index_of`, `last_index_of` |
//! | [`Value::same_value_zero`] | equal   | equal        | `includes`                |
//! | [`Value::same_value`]      | equal   | unequal      | change detection          |
//!
//! Objects, proxies and refs compare by identity under all three.

mod key;
mod object;

pub use key::{Key, Symbol};
pub use object::{ObjectKind, RawObject};

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::proxy::Proxy;
use crate::reactive::Ref;

/// Identity of anything the runtime can observe or wrap: raw objects,
/// proxies, refs and computed values share one id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dynamically-typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Symbol),
    Object(RawObject),
    Proxy(Proxy),
    Ref(Ref),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Object(_) => "object",
            Value::Proxy(_) => "proxy",
            Value::Ref(_) => "ref",
        }
    }

    /// Whether the value can be wrapped in a proxy.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Proxy(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&RawObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn into_proxy(self) -> Option<Proxy> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(cell) => Some(cell),
            _ => None,
        }
    }

    /// Identity of an object, proxy or ref.
    pub fn identity(&self) -> Option<ObjectId> {
        match self {
            Value::Object(object) => Some(object.id()),
            Value::Proxy(proxy) => Some(proxy.id()),
            Value::Ref(cell) => Some(cell.id()),
            _ => None,
        }
    }

    /// `Object.is` semantics: `NaN` equals itself, `+0` differs from `-0`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            _ => self == other,
        }
    }

    /// `SameValueZero`: like [`Value::same_value`] but `+0` equals `-0`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self == other,
        }
    }
}

/// Whether a write of `new` over `old` is an observable change.
pub fn has_changed(new: &Value, old: &Value) -> bool {
    !new.same_value(old)
}

impl PartialEq for Value {
    /// Strict equality.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Proxy(a), Value::Proxy(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Number(number) => write!(f, "{number}"),
            Value::String(text) => write!(f, "{text:?}"),
            Value::Symbol(symbol) => write!(f, "{symbol:?}"),
            Value::Object(object) => write!(f, "{object:?}"),
            Value::Proxy(proxy) => write!(f, "{proxy:?}"),
            Value::Ref(cell) => write!(f, "{cell:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Number(f64::from(number))
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(number as f64)
    }
}

impl From<usize> for Value {
    fn from(number: usize) -> Self {
        Value::Number(number as f64)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(Rc::from(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(Rc::from(text))
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<RawObject> for Value {
    fn from(object: RawObject) -> Self {
        Value::Object(object)
    }
}

impl From<Proxy> for Value {
    fn from(proxy: Proxy) -> Self {
        Value::Proxy(proxy)
    }
}

impl From<Ref> for Value {
    fn from(cell: Ref) -> Self {
        Value::Ref(cell)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Index(index) => Value::from(index),
            Key::Name(name) => Value::String(Rc::from(name.as_ref())),
            Key::Symbol(symbol) => Value::Symbol(symbol),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(flag),
            serde_json::Value::Number(number) => {
                Value::Number(number.as_f64().unwrap_or(f64::NAN))
            }
            serde_json::Value::String(text) => Value::from(text),
            serde_json::Value::Array(items) => Value::Object(RawObject::array(items)),
            serde_json::Value::Object(entries) => Value::Object(RawObject::from_entries(entries)),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| mismatch("number", &value))
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_f64() {
            Some(number) if number.fract() == 0.0 => Ok(number as i64),
            _ => Err(mismatch("integer", &value)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| mismatch("boolean", &value))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(text.to_string()),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl TryFrom<Value> for RawObject {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl TryFrom<Value> for Proxy {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Proxy(proxy) => Ok(proxy),
            Value::Object(_) => Err(mismatch("proxy", &value)),
            other => Err(Error::NotAnObject {
                found: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_treats_nan_as_unequal() {
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_eq!(Value::from(0.0), Value::from(-0.0));
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
    }

    #[test]
    fn change_detection_uses_same_value() {
        assert!(!has_changed(&Value::from(f64::NAN), &Value::from(f64::NAN)));
        assert!(has_changed(&Value::from(0.0), &Value::from(-0.0)));
        assert!(!has_changed(&Value::from(1), &Value::from(1.0)));
        assert!(has_changed(&Value::Null, &Value::Undefined));
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = RawObject::plain();
        let b = RawObject::plain();
        assert_eq!(Value::from(a.clone()), Value::from(a));
        assert_ne!(Value::from(b), Value::from(RawObject::plain()));
    }

    #[test]
    fn json_literals_build_raw_graphs() {
        let value = Value::from(serde_json::json!({
            "name": "ripple",
            "tags": ["a", "b"],
            "nested": { "ok": true }
        }));
        let object = value.as_object().unwrap();
        assert_eq!(object.get("name"), Value::from("ripple"));
        assert!(object.get("tags").as_object().unwrap().is_array());
        let nested = object.get("nested");
        assert_eq!(nested.as_object().unwrap().get("ok"), Value::Bool(true));
    }

    #[test]
    fn conversions_report_type_mismatches() {
        assert_eq!(f64::try_from(Value::from(2)).unwrap(), 2.0);
        assert_eq!(i64::try_from(Value::from(7)).unwrap(), 7);
        assert!(i64::try_from(Value::from(7.5)).is_err());
        let err = String::try_from(Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "type mismatch: expected string, found null");
        let err = Proxy::try_from(Value::from(1)).unwrap_err();
        assert!(matches!(err, Error::NotAnObject { found: "number" }));
    }
}
