//! Reference Cells
//!
//! A [`Ref`] boxes a single value and has its own identity in the
//! dependency store, with a single `value` key. Reading tracks that key;
//! writing a changed value triggers it.
//!
//! # Deep and shallow refs
//!
//! A deep ref (the default) stores the raw value it was given, but an
//! object stored in it reads back as a reactive proxy. A shallow ref
//! stores and returns exactly what it was given; replacing the whole value
//! is the only observable change, and [`Ref::trigger`] notifies readers
//! after mutating a shallowly stored object in place.
//!
//! Refs found as properties of a reactive object are unwrapped on read,
//! and writes to such a property go into the ref (see [`crate::proxy`]).

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, TrackOp, Trackable, TriggerOp};
use crate::proxy::{reactive, to_raw};
use crate::value::{has_changed, Key, ObjectId, Value};

struct RefInner {
    id: ObjectId,
    shallow: bool,
    /// The value as given, with proxies unwrapped for deep refs.
    raw: RefCell<Value>,
    /// The value handed to readers.
    value: RefCell<Value>,
}

/// A reactive box around one value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
/// let reader = count.clone();
/// let _log = effect(move || println!("count: {:?}", reader.get()));
///
/// count.set(5); // prints "count: 5"
/// ```
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    /// A deep ref: objects read back as reactive proxies.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::create(value.into(), false)
    }

    /// A shallow ref: the value is stored and returned as given.
    pub fn shallow(value: impl Into<Value>) -> Self {
        Self::create(value.into(), true)
    }

    fn create(value: Value, shallow: bool) -> Self {
        let raw = if shallow { value } else { to_raw(&value) };
        let value = convert(&raw, shallow);
        Self(Rc::new(RefInner {
            id: ObjectId::next(),
            shallow,
            raw: RefCell::new(raw),
            value: RefCell::new(value),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn is_shallow(&self) -> bool {
        self.0.shallow
    }

    /// Read the value, tracking it for the running effect.
    pub fn get(&self) -> Value {
        Runtime::track(self, TrackOp::Get, &Key::VALUE);
        self.get_untracked()
    }

    /// Read the value without establishing a dependency.
    pub fn get_untracked(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Replace the value. Readers re-run only if it changed.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let raw = if self.0.shallow {
            value.clone()
        } else {
            to_raw(&value)
        };
        let old = self.0.raw.borrow().clone();
        if !has_changed(&raw, &old) {
            return;
        }

        *self.0.raw.borrow_mut() = raw.clone();
        *self.0.value.borrow_mut() = convert(&raw, self.0.shallow);
        Runtime::trigger(self, TriggerOp::Set, Some(&Key::VALUE), Some(&value), Some(&old));
    }

    /// Notify readers without changing the value.
    pub fn trigger(&self) {
        let value = self.get_untracked();
        Runtime::trigger(self, TriggerOp::Set, Some(&Key::VALUE), Some(&value), None);
    }
}

fn convert(raw: &Value, shallow: bool) -> Value {
    if !shallow && raw.is_object() {
        reactive(raw.clone())
    } else {
        raw.clone()
    }
}

impl Trackable for Ref {
    fn target_id(&self) -> ObjectId {
        self.0.id
    }

    fn liveness(&self) -> Weak<dyn Any> {
        let weak: Weak<RefInner> = Rc::downgrade(&self.0);
        weak
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Ref {}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.0.id)
            .field("shallow", &self.0.shallow)
            .field("value", &*self.0.raw.borrow())
            .finish()
    }
}

/// Whether the value is a reference cell.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// The boxed value of a ref (tracked), or the value itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(cell) => cell.get(),
        other => other.clone(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::is_reactive;
    use crate::reactive::effect;
    use crate::value::RawObject;
    use std::cell::Cell;

    fn watch(cell: &Ref) -> (Rc<Cell<usize>>, crate::reactive::Effect<()>) {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let reader = cell.clone();
        let handle = effect(move || {
            runs_clone.set(runs_clone.get() + 1);
            reader.get();
        });
        (runs, handle)
    }

    #[test]
    fn ref_get_set() {
        let cell = Ref::new(0);
        assert_eq!(cell.get(), Value::from(0));

        cell.set(5);
        assert_eq!(cell.get(), Value::from(5));
    }

    #[test]
    fn readers_rerun_on_change_only() {
        let cell = Ref::new(1);
        let (runs, _effect) = watch(&cell);

        cell.set(2);
        assert_eq!(runs.get(), 2);
        cell.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nan_is_unchanged_but_signed_zero_is_not() {
        let cell = Ref::new(f64::NAN);
        let (runs, _effect) = watch(&cell);

        cell.set(f64::NAN);
        assert_eq!(runs.get(), 1);

        cell.set(0.0);
        cell.set(-0.0);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn deep_refs_wrap_objects() {
        let object = RawObject::plain();
        let cell = Ref::new(object.clone());
        assert!(is_reactive(&cell.get()));
        assert_eq!(cell.get(), reactive(object.clone()));

        // Storing the proxy of the same object is not a change.
        let (runs, _effect) = watch(&cell);
        cell.set(reactive(object));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn shallow_refs_store_as_given() {
        let object = RawObject::plain();
        let cell = Ref::shallow(object.clone());
        assert_eq!(cell.get(), Value::Object(object));

        let (runs, _effect) = watch(&cell);
        cell.trigger();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unref_and_is_ref() {
        let cell = Ref::new("boxed");
        let boxed = Value::from(cell);
        assert!(is_ref(&boxed));
        assert_eq!(unref(&boxed), Value::from("boxed"));
        assert_eq!(unref(&Value::from(3)), Value::from(3));
    }
}
