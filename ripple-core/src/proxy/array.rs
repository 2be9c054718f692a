//! Array Instrumentation
//!
//! Two families of array methods need special handling on mutable proxies.
//!
//! Identity-sensitive searches (`includes`, `index_of`, `last_index_of`)
//! run against the raw array, first with the argument as given and then,
//! if nothing matched, with the argument and the elements unwrapped. A
//! proxy finds its raw element and a raw value finds an element stored as
//! its proxy. Because the search bypasses indexed reads, every index is
//! tracked up front.
//!
//! Length-altering methods (`push`, `pop`, `shift`, `unshift`, `splice`)
//! run with tracking paused. They read and write `length` internally, and
//! tracking those reads would make an effect that pushes re-trigger itself.
//! Element moves still go through the proxy, so subscribers of the touched
//! indices are notified as usual.
//!
//! Readonly proxies use the uninstrumented path: the same algorithms run
//! through their handler, which neither tracks nor mutates.
//!
//! On proxies of anything other than an array these methods do nothing:
//! searches miss, removals yield `Undefined` and insertions report length 0.

use smallvec::SmallVec;

use super::{to_raw, Proxy};
use crate::reactive::{Runtime, TrackOp, TrackingPause};
use crate::value::{Key, ObjectKind, Value};

#[derive(Clone, Copy)]
enum Search {
    Includes,
    IndexOf,
    LastIndexOf,
}

enum Found {
    Membership(bool),
    Position(Option<usize>),
}

impl Found {
    fn is_miss(&self) -> bool {
        matches!(self, Found::Membership(false) | Found::Position(None))
    }
}

fn search_in(method: Search, elements: &[Value], needle: &Value) -> Found {
    match method {
        Search::Includes => {
            Found::Membership(elements.iter().any(|element| element.same_value_zero(needle)))
        }
        Search::IndexOf => Found::Position(elements.iter().position(|element| element == needle)),
        Search::LastIndexOf => {
            Found::Position(elements.iter().rposition(|element| element == needle))
        }
    }
}

impl Proxy {
    fn is_array(&self) -> bool {
        self.kind() == ObjectKind::Array
    }

    fn is_instrumented_array(&self) -> bool {
        !self.is_readonly() && self.is_array()
    }

    /// Membership by `SameValueZero`.
    pub fn includes(&self, value: impl Into<Value>) -> bool {
        matches!(
            self.search(Search::Includes, value.into()),
            Found::Membership(true)
        )
    }

    /// First index holding a strictly-equal element.
    pub fn index_of(&self, value: impl Into<Value>) -> Option<usize> {
        match self.search(Search::IndexOf, value.into()) {
            Found::Position(position) => position,
            Found::Membership(_) => None,
        }
    }

    /// Last index holding a strictly-equal element.
    pub fn last_index_of(&self, value: impl Into<Value>) -> Option<usize> {
        match self.search(Search::LastIndexOf, value.into()) {
            Found::Position(position) => position,
            Found::Membership(_) => None,
        }
    }

    fn search(&self, method: Search, needle: Value) -> Found {
        if !self.is_array() {
            return search_in(method, &[], &needle);
        }
        if !self.is_instrumented_array() {
            let elements: Vec<Value> = (0..self.len()).map(|index| self.get(index)).collect();
            return search_in(method, &elements, &needle);
        }

        let raw = self.target().raw();
        for index in 0..self.len() {
            Runtime::track(&raw, TrackOp::Get, &Key::Index(index));
        }

        let found = match method {
            Search::Includes => Found::Membership(raw.includes(&needle)),
            Search::IndexOf => Found::Position(raw.index_of(&needle)),
            Search::LastIndexOf => Found::Position(raw.last_index_of(&needle)),
        };
        if !found.is_miss() {
            return found;
        }

        let elements: Vec<Value> = (0..raw.len())
            .map(|index| to_raw(&raw.get(index)))
            .collect();
        search_in(method, &elements, &to_raw(&needle))
    }

    fn pause_if_instrumented(&self) -> Option<TrackingPause> {
        self.is_instrumented_array().then(TrackingPause::new)
    }

    /// Move the element at `from` to `to`, or clear `to` if `from` is empty.
    fn move_element(&self, from: usize, to: usize) {
        if self.has(from) {
            let element = self.get(from);
            self.set(to, element);
        } else {
            self.delete(to);
        }
    }

    /// Append elements, returning the new length.
    pub fn push<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> usize {
        if !self.is_array() {
            return 0;
        }
        let _pause = self.pause_if_instrumented();
        let mut length = self.len();
        for value in values {
            self.set(length, value);
            length += 1;
        }
        self.set(Key::LENGTH, length);
        length
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        if !self.is_array() {
            return Value::Undefined;
        }
        let _pause = self.pause_if_instrumented();
        let length = self.len();
        if length == 0 {
            self.set(Key::LENGTH, 0);
            return Value::Undefined;
        }
        let last = length - 1;
        let element = self.get(last);
        self.delete(last);
        self.set(Key::LENGTH, last);
        element
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Value {
        if !self.is_array() {
            return Value::Undefined;
        }
        let _pause = self.pause_if_instrumented();
        let length = self.len();
        if length == 0 {
            self.set(Key::LENGTH, 0);
            return Value::Undefined;
        }
        let first = self.get(0usize);
        for index in 1..length {
            self.move_element(index, index - 1);
        }
        self.delete(length - 1);
        self.set(Key::LENGTH, length - 1);
        first
    }

    /// Prepend elements, returning the new length.
    pub fn unshift<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> usize {
        if !self.is_array() {
            return 0;
        }
        let _pause = self.pause_if_instrumented();
        let items: SmallVec<[Value; 4]> = values.into_iter().map(Into::into).collect();
        let length = self.len();
        let count = items.len();
        if count > 0 {
            for index in (0..length).rev() {
                self.move_element(index, index + count);
            }
            for (offset, item) in items.into_iter().enumerate() {
                self.set(offset, item);
            }
        }
        self.set(Key::LENGTH, length + count);
        length + count
    }

    /// Remove `delete_count` elements at `start` (all remaining when `None`)
    /// and insert `values` in their place. A negative `start` counts from
    /// the end. Returns the removed elements.
    pub fn splice<V: Into<Value>>(
        &self,
        start: isize,
        delete_count: Option<usize>,
        values: impl IntoIterator<Item = V>,
    ) -> Vec<Value> {
        if !self.is_array() {
            return Vec::new();
        }
        let _pause = self.pause_if_instrumented();
        let items: SmallVec<[Value; 4]> = values.into_iter().map(Into::into).collect();
        let length = self.len();
        let start = if start < 0 {
            length.saturating_sub(start.unsigned_abs())
        } else {
            start.unsigned_abs().min(length)
        };
        let delete_count = delete_count.map_or(length - start, |count| count.min(length - start));
        let insert_count = items.len();

        let removed: Vec<Value> = (start..start + delete_count)
            .filter(|&index| self.has(index))
            .map(|index| self.get(index))
            .collect();

        if insert_count < delete_count {
            for index in start..length - delete_count {
                self.move_element(index + delete_count, index + insert_count);
            }
            for index in (length - delete_count + insert_count..length).rev() {
                self.delete(index);
            }
        } else if insert_count > delete_count {
            for index in (start..length - delete_count).rev() {
                self.move_element(index + delete_count, index + insert_count);
            }
        }

        for (offset, item) in items.into_iter().enumerate() {
            self.set(start + offset, item);
        }
        self.set(Key::LENGTH, length - delete_count + insert_count);
        removed
    }
}
