//! Raw Objects
//!
//! A [`RawObject`] is the caller-owned data that proxies observe. It is a
//! cheap, shared handle: cloning it clones the handle, never the data, and
//! every clone addresses the same object identity.
//!
//! Raw operations never track or trigger. Reads and writes on plain objects
//! follow the prototype chain with an explicit receiver, so when a
//! prototype happens to be a proxy, that proxy's handler runs with the
//! original receiver (see [`crate::proxy`]).
//!
//! Arrays have no holes: deleting an element stores `Undefined` and keeps
//! the length unchanged.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::{Key, ObjectId, Value};
use crate::proxy::{reflect, Receiver, Target};

/// Structural kind of a raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Plain,
    Array,
    Map,
    Set,
}

pub(crate) enum ObjectData {
    Plain {
        props: IndexMap<Key, Value>,
        proto: Option<Value>,
    },
    Array(Vec<Value>),
    Map(IndexMap<Key, Value>),
    Set(IndexSet<Key>),
}

struct ObjectInner {
    id: ObjectId,
    data: RefCell<ObjectData>,
}

/// Shared handle to caller-owned object data.
#[derive(Clone)]
pub struct RawObject(Rc<ObjectInner>);

impl RawObject {
    fn from_data(data: ObjectData) -> Self {
        Self(Rc::new(ObjectInner {
            id: ObjectId::next(),
            data: RefCell::new(data),
        }))
    }

    /// An empty plain object with no prototype.
    pub fn plain() -> Self {
        Self::from_data(ObjectData::Plain {
            props: IndexMap::new(),
            proto: None,
        })
    }

    /// An empty plain object inheriting from `proto`.
    pub fn with_proto(proto: impl Into<Value>) -> Self {
        Self::from_data(ObjectData::Plain {
            props: IndexMap::new(),
            proto: Some(proto.into()),
        })
    }

    /// A plain object with the given own properties, in order.
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::from_data(ObjectData::Plain {
            props: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            proto: None,
        })
    }

    pub fn array<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::from_data(ObjectData::Array(values.into_iter().map(Into::into).collect()))
    }

    /// A map-like collection.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::from_data(ObjectData::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    /// A set-like collection.
    pub fn set_of<K: Into<Key>>(members: impl IntoIterator<Item = K>) -> Self {
        Self::from_data(ObjectData::Set(members.into_iter().map(Into::into).collect()))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn kind(&self) -> ObjectKind {
        match &*self.0.data.borrow() {
            ObjectData::Plain { .. } => ObjectKind::Plain,
            ObjectData::Array(_) => ObjectKind::Array,
            ObjectData::Map(_) => ObjectKind::Map,
            ObjectData::Set(_) => ObjectKind::Set,
        }
    }

    pub fn is_array(&self) -> bool {
        self.kind() == ObjectKind::Array
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind(), ObjectKind::Map | ObjectKind::Set)
    }

    /// Array length, collection size, or own property count.
    pub fn len(&self) -> usize {
        match &*self.0.data.borrow() {
            ObjectData::Plain { props, .. } => props.len(),
            ObjectData::Array(items) => items.len(),
            ObjectData::Map(entries) => entries.len(),
            ObjectData::Set(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn proto(&self) -> Option<Value> {
        match &*self.0.data.borrow() {
            ObjectData::Plain { proto, .. } => proto.clone(),
            _ => None,
        }
    }

    /// Read a property, following the prototype chain.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        reflect::get(
            &Target::Raw(self.clone()),
            &key.into(),
            &Receiver::Raw(self.clone()),
        )
    }

    /// Write a property. Returns `false` when the object rejects the write
    /// (an invalid array length, or a named property on an array).
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        reflect::set(
            &Target::Raw(self.clone()),
            &key.into(),
            value.into(),
            &Receiver::Raw(self.clone()),
        )
    }

    /// Whether the key exists on the object or its prototype chain.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        reflect::has(&Target::Raw(self.clone()), &key.into())
    }

    pub fn delete(&self, key: impl Into<Key>) -> bool {
        self.delete_own(&key.into())
    }

    /// Own keys: indices ascending, then names and symbols in insertion order.
    pub fn own_keys(&self) -> Vec<Key> {
        match &*self.0.data.borrow() {
            ObjectData::Plain { props, .. } => {
                let mut indices: Vec<Key> = props
                    .keys()
                    .filter(|key| key.as_index().is_some())
                    .cloned()
                    .collect();
                indices.sort_by_key(|key| key.as_index());
                let names = props.keys().filter(|key| matches!(key, Key::Name(_)));
                let symbols = props.keys().filter(|key| matches!(key, Key::Symbol(_)));
                indices.extend(names.chain(symbols).cloned());
                indices
            }
            ObjectData::Array(items) => (0..items.len())
                .map(Key::Index)
                .chain(std::iter::once(Key::LENGTH))
                .collect(),
            ObjectData::Map(_) | ObjectData::Set(_) => Vec::new(),
        }
    }

    pub fn has_own(&self, key: &Key) -> bool {
        match &*self.0.data.borrow() {
            ObjectData::Plain { props, .. } => props.contains_key(key),
            ObjectData::Array(items) => match key {
                Key::Index(index) => *index < items.len(),
                other => *other == Key::LENGTH,
            },
            ObjectData::Map(_) | ObjectData::Set(_) => false,
        }
    }

    /// Own-property lookup without walking the prototype chain.
    pub(crate) fn get_own(&self, key: &Key) -> Option<Value> {
        match &*self.0.data.borrow() {
            ObjectData::Plain { props, proto } => {
                if *key == Key::PROTO {
                    return Some(proto.clone().unwrap_or(Value::Null));
                }
                props.get(key).cloned()
            }
            ObjectData::Array(items) => match key {
                Key::Index(index) => items.get(*index).cloned(),
                other if *other == Key::LENGTH => Some(Value::from(items.len())),
                _ => None,
            },
            ObjectData::Map(entries) if *key == Key::SIZE => Some(Value::from(entries.len())),
            ObjectData::Set(members) if *key == Key::SIZE => Some(Value::from(members.len())),
            ObjectData::Map(_) | ObjectData::Set(_) => None,
        }
    }

    /// Create or overwrite an own data property.
    pub(crate) fn define(&self, key: &Key, value: Value) -> bool {
        let mut data = self.0.data.borrow_mut();
        match &mut *data {
            ObjectData::Plain { props, .. } => {
                props.insert(key.clone(), value);
                true
            }
            ObjectData::Array(items) => match key {
                Key::Index(index) => {
                    if *index >= items.len() {
                        match index.checked_add(1) {
                            Some(length) if length <= MAX_ARRAY_LENGTH => {
                                items.resize(length, Value::Undefined)
                            }
                            _ => return false,
                        }
                    }
                    items[*index] = value;
                    true
                }
                other if *other == Key::LENGTH => match array_length(&value) {
                    Some(length) => {
                        items.resize(length, Value::Undefined);
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            ObjectData::Map(_) | ObjectData::Set(_) => false,
        }
    }

    pub(crate) fn delete_own(&self, key: &Key) -> bool {
        let mut data = self.0.data.borrow_mut();
        match &mut *data {
            ObjectData::Plain { props, .. } => {
                props.shift_remove(key);
                true
            }
            ObjectData::Array(items) => match key {
                Key::Index(index) => {
                    if let Some(slot) = items.get_mut(*index) {
                        *slot = Value::Undefined;
                    }
                    true
                }
                other => *other != Key::LENGTH,
            },
            ObjectData::Map(_) | ObjectData::Set(_) => true,
        }
    }

    /// First index holding a strictly-equal element.
    pub fn index_of(&self, needle: &Value) -> Option<usize> {
        match &*self.0.data.borrow() {
            ObjectData::Array(items) => items.iter().position(|item| item == needle),
            _ => None,
        }
    }

    /// Last index holding a strictly-equal element.
    pub fn last_index_of(&self, needle: &Value) -> Option<usize> {
        match &*self.0.data.borrow() {
            ObjectData::Array(items) => items.iter().rposition(|item| item == needle),
            _ => None,
        }
    }

    /// Membership by `SameValueZero`, so `NaN` finds `NaN`.
    pub fn includes(&self, needle: &Value) -> bool {
        match &*self.0.data.borrow() {
            ObjectData::Array(items) => items.iter().any(|item| item.same_value_zero(needle)),
            _ => false,
        }
    }

    pub fn collection_get(&self, key: &Key) -> Option<Value> {
        match &*self.0.data.borrow() {
            ObjectData::Map(entries) => entries.get(key).cloned(),
            _ => None,
        }
    }

    pub fn collection_has(&self, key: &Key) -> bool {
        match &*self.0.data.borrow() {
            ObjectData::Map(entries) => entries.contains_key(key),
            ObjectData::Set(members) => members.contains(key),
            _ => false,
        }
    }

    /// Insert into a map, returning the previous value.
    pub fn collection_set(&self, key: Key, value: Value) -> Option<Value> {
        match &mut *self.0.data.borrow_mut() {
            ObjectData::Map(entries) => entries.insert(key, value),
            _ => None,
        }
    }

    /// Insert into a set, returning whether the member is new.
    pub fn collection_add(&self, key: Key) -> bool {
        match &mut *self.0.data.borrow_mut() {
            ObjectData::Set(members) => members.insert(key),
            _ => false,
        }
    }

    pub fn collection_remove(&self, key: &Key) -> bool {
        match &mut *self.0.data.borrow_mut() {
            ObjectData::Map(entries) => entries.shift_remove(key).is_some(),
            ObjectData::Set(members) => members.shift_remove(key),
            _ => false,
        }
    }

    pub fn collection_clear(&self) {
        match &mut *self.0.data.borrow_mut() {
            ObjectData::Map(entries) => entries.clear(),
            ObjectData::Set(members) => members.clear(),
            _ => {}
        }
    }

    pub fn collection_keys(&self) -> Vec<Key> {
        match &*self.0.data.borrow() {
            ObjectData::Map(entries) => entries.keys().cloned().collect(),
            ObjectData::Set(members) => members.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Entries of a map; a set reports each member as both key and value.
    pub fn collection_entries(&self) -> Vec<(Key, Value)> {
        match &*self.0.data.borrow() {
            ObjectData::Map(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            ObjectData::Set(members) => members
                .iter()
                .map(|key| (key.clone(), Value::from(key.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn liveness(&self) -> Weak<dyn Any> {
        let weak: Weak<ObjectInner> = Rc::downgrade(&self.0);
        weak
    }
}

/// Arrays are dense, so growth past this many slots is refused.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

fn array_length(value: &Value) -> Option<usize> {
    let length = value.as_f64()?;
    let valid = length >= 0.0 && length.fract() == 0.0 && length <= MAX_ARRAY_LENGTH as f64;
    valid.then_some(length as usize)
}

impl PartialEq for RawObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RawObject {}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.data.try_borrow() {
            Ok(_) => write!(f, "{:?}#{}(len={})", self.kind(), self.id(), self.len()),
            Err(_) => write!(f, "Object#{}", self.id()),
        }
    }
}
