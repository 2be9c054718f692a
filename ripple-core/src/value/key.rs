//! Property keys and symbols.
//!
//! Keys mirror the three shapes a property name can take: a canonical
//! array index, a string name, or a symbol. Strings that spell a canonical
//! non-negative integer ("0", "17", but not "017" or "-1") normalize into
//! [`Key::Index`], so `obj["3"]` and `obj[3]` address the same slot.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// A symbol, compared by identity.
///
/// Well-known symbols are process-wide constants. Two further constants,
/// [`Symbol::ITERATE`] and [`Symbol::MAP_KEY_ITERATE`], are the structural
/// markers that key iteration dependencies in the dependency store.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Cow<'static, str>,
}

/// Highest id reserved for well-known symbols.
const LAST_WELL_KNOWN: u64 = 13;

/// First id handed out to user-created symbols.
const FIRST_USER_SYMBOL: u64 = 64;

impl Symbol {
    pub const ASYNC_ITERATOR: Symbol = Symbol::constant(1, "Symbol.asyncIterator");
    pub const HAS_INSTANCE: Symbol = Symbol::constant(2, "Symbol.hasInstance");
    pub const IS_CONCAT_SPREADABLE: Symbol = Symbol::constant(3, "Symbol.isConcatSpreadable");
    pub const ITERATOR: Symbol = Symbol::constant(4, "Symbol.iterator");
    pub const MATCH: Symbol = Symbol::constant(5, "Symbol.match");
    pub const MATCH_ALL: Symbol = Symbol::constant(6, "Symbol.matchAll");
    pub const REPLACE: Symbol = Symbol::constant(7, "Symbol.replace");
    pub const SEARCH: Symbol = Symbol::constant(8, "Symbol.search");
    pub const SPECIES: Symbol = Symbol::constant(9, "Symbol.species");
    pub const SPLIT: Symbol = Symbol::constant(10, "Symbol.split");
    pub const TO_PRIMITIVE: Symbol = Symbol::constant(11, "Symbol.toPrimitive");
    pub const TO_STRING_TAG: Symbol = Symbol::constant(12, "Symbol.toStringTag");
    pub const UNSCOPABLES: Symbol = Symbol::constant(LAST_WELL_KNOWN, "Symbol.unscopables");

    /// Marker key for dependencies on an object's set of keys.
    pub const ITERATE: Symbol = Symbol::constant(32, "iterate");

    /// Marker key for dependencies on a map's keys (but not its values).
    pub const MAP_KEY_ITERATE: Symbol = Symbol::constant(33, "Map key iterate");

    const fn constant(id: u64, description: &'static str) -> Self {
        Self {
            id,
            description: Cow::Borrowed(description),
        }
    }

    /// Create a fresh symbol, distinct from every other symbol.
    pub fn new(description: impl Into<String>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(FIRST_USER_SYMBOL);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            description: Cow::Owned(description.into()),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether this is one of the language-level well-known symbols.
    ///
    /// Reads of these keys bypass dependency tracking entirely.
    pub fn is_well_known(&self) -> bool {
        self.id <= LAST_WELL_KNOWN
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// A property key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(Cow<'static, str>),
    Symbol(Symbol),
}

impl Key {
    pub const LENGTH: Key = Key::Name(Cow::Borrowed("length"));
    pub const SIZE: Key = Key::Name(Cow::Borrowed("size"));
    pub const VALUE: Key = Key::Name(Cow::Borrowed("value"));
    pub const PROTO: Key = Key::Name(Cow::Borrowed("__proto__"));

    // Reserved introspection keys. Proxies answer these from their variant
    // flags; they are never stored as own properties.
    pub const IS_REACTIVE: Key = Key::Name(Cow::Borrowed("__v_isReactive"));
    pub const IS_READONLY: Key = Key::Name(Cow::Borrowed("__v_isReadonly"));
    pub const RAW: Key = Key::Name(Cow::Borrowed("__v_raw"));
    pub const IS_REF: Key = Key::Name(Cow::Borrowed("__v_isRef"));

    /// Largest array index. Integer keys above it are plain names.
    pub const MAX_INDEX: usize = u32::MAX as usize - 1;

    pub const ITERATE: Key = Key::Symbol(Symbol::ITERATE);
    pub const MAP_KEY_ITERATE: Key = Key::Symbol(Symbol::MAP_KEY_ITERATE);

    /// The array index this key addresses, if any.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            _ => None,
        }
    }

    pub fn is_well_known_symbol(&self) -> bool {
        matches!(self, Key::Symbol(symbol) if symbol.is_well_known())
    }

    fn parse(name: &str) -> Option<usize> {
        let index: usize = name.parse().ok()?;
        (index <= Key::MAX_INDEX && index.to_string() == name).then_some(index)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        if index <= Key::MAX_INDEX {
            Key::Index(index)
        } else {
            Key::Name(Cow::Owned(index.to_string()))
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match Key::parse(name) {
            Some(index) => Key::Index(index),
            None => Key::Name(Cow::Owned(name.to_owned())),
        }
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        match Key::parse(&name) {
            Some(index) => Key::Index(index),
            None => Key::Name(Cow::Owned(name)),
        }
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        Key::Symbol(symbol)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
            Key::Symbol(symbol) => write!(f, "{symbol:?}"),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{name:?}"),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_integer_strings_become_indices() {
        assert_eq!(Key::from("0"), Key::Index(0));
        assert_eq!(Key::from("42"), Key::Index(42));
        assert_eq!(Key::from(String::from("7")), Key::Index(7));
    }

    #[test]
    fn integers_past_the_index_range_are_names() {
        assert_eq!(Key::from("4294967294"), Key::Index(Key::MAX_INDEX));
        assert!(matches!(Key::from("4294967295"), Key::Name(_)));
        assert!(matches!(Key::from("18446744073709551615"), Key::Name(_)));
        assert_eq!(Key::from(usize::MAX), Key::from("18446744073709551615"));
    }

    #[test]
    fn non_canonical_strings_stay_names() {
        for name in ["01", "-1", "1.5", "NaN", "", " 3", "length"] {
            assert!(matches!(Key::from(name), Key::Name(_)), "{name:?}");
        }
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new("tag");
        let b = Symbol::new("tag");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.description(), "tag");
    }

    #[test]
    fn only_language_symbols_are_well_known() {
        assert!(Symbol::ITERATOR.is_well_known());
        assert!(Symbol::UNSCOPABLES.is_well_known());
        assert!(!Symbol::ITERATE.is_well_known());
        assert!(!Symbol::MAP_KEY_ITERATE.is_well_known());
        assert!(!Symbol::new("user").is_well_known());
    }
}
