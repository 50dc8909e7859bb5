//! Flexible accessor: a key/value map that tolerates the string and symbol
//! forms of a key interchangeably.
//!
//! Reads probe `exact → string → symbol`; writes reuse an existing entry
//! probing `string → symbol → exact`. The write order prefers the string
//! form so that an existing entry is overwritten instead of a new symbolic
//! key being created. Both orders are relied on by the record layer.

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::DelogError;
use crate::value::{Key, Value};

/// Suffix that turns an attribute name into a membership test.
pub const PREDICATE_MARKER: char = '?';

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Accessor {
    entries: IndexMap<Key, Value>,
}

/// What an attribute-style call resolves to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttrCall<'a> {
    Get(Key),
    Test(Key, &'a [Value]),
    Set(Key, Value),
}

impl<'a> AttrCall<'a> {
    /// Classify `name(args...)` the way attribute dispatch does: a trailing
    /// predicate marker with candidates is a membership test, zero args a
    /// read, one arg a write.
    pub(crate) fn classify(name: &str, args: &'a [Value]) -> Result<Self, DelogError> {
        if let Some(base) = name.strip_suffix(PREDICATE_MARKER) {
            if !args.is_empty() {
                return Ok(AttrCall::Test(Key::str(base), args));
            }
        }

        match args {
            [] => Ok(AttrCall::Get(Key::sym(name))),
            [value] => Ok(AttrCall::Set(Key::sym(name), value.clone())),
            _ => Err(DelogError::Arity {
                name: name.to_string(),
                given: args.len(),
            }),
        }
    }
}

impl Accessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from capture groups. Every named group is present; groups that
    /// did not participate in the match map to `Value::Nil`.
    pub fn from_captures(pattern: &Regex, captures: &Captures<'_>) -> Self {
        let entries = pattern
            .capture_names()
            .flatten()
            .map(|name| {
                let value = captures
                    .name(name)
                    .map(|m| Value::Str(m.as_str().to_string()))
                    .unwrap_or(Value::Nil);
                (Key::str(name), value)
            })
            .collect();

        Self { entries }
    }

    /// Exact-key lookup, no form guessing.
    pub fn exact(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn has_exact_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Value for `name`, trying the exact key, then its string form, then
    /// its symbolic form.
    pub fn get(&self, name: impl Into<Key>) -> Option<&Value> {
        let key = name.into();
        self.entries
            .get(&key)
            .or_else(|| self.entries.get(&key.to_str_form()))
            .or_else(|| self.entries.get(&key.to_sym_form()))
    }

    /// Text of the value for `name`, if it is a string or symbol.
    pub fn get_str(&self, name: impl Into<Key>) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Owned value for `name`, `Value::Nil` when absent.
    pub fn value(&self, name: impl Into<Key>) -> Value {
        self.get(name).cloned().unwrap_or_default()
    }

    /// Store `value` under `name`, overwriting an equivalent key if one
    /// exists (string form first, then symbol form), otherwise inserting
    /// under `name` exactly as given.
    pub fn set(&mut self, name: impl Into<Key>, value: impl Into<Value>) {
        let key = name.into();
        let value = value.into();
        let str_form = key.to_str_form();
        let sym_form = key.to_sym_form();

        let target = if self.entries.contains_key(&str_form) {
            str_form
        } else if self.entries.contains_key(&sym_form) {
            sym_form
        } else {
            key
        };

        self.entries.insert(target, value);
    }

    pub fn has_key(&self, name: impl Into<Key>) -> bool {
        let key = name.into();
        self.has_exact_key(&key)
            || self.has_exact_key(&key.to_str_form())
            || self.has_exact_key(&key.to_sym_form())
    }

    /// Remove `name` (first equivalent form found, read order).
    pub fn remove(&mut self, name: impl Into<Key>) -> Option<Value> {
        let key = name.into();
        [key.clone(), key.to_str_form(), key.to_sym_form()]
            .iter()
            .find_map(|candidate| self.entries.shift_remove(candidate))
    }

    /// True when the value stored under `name` equals any of `candidates`.
    /// An absent key compares as `Value::Nil`.
    pub fn is(&self, name: impl Into<Key>, candidates: &[Value]) -> bool {
        let current = self.value(name);
        candidates.contains(&current)
    }

    /// Attribute-style dispatch: `name()` reads, `name(v)` writes and
    /// returns `v`, `name?(a, b, ..)` tests membership.
    pub fn attr(&mut self, name: &str, args: &[Value]) -> Result<Value, DelogError> {
        match AttrCall::classify(name, args)? {
            AttrCall::Get(key) => Ok(self.value(key)),
            AttrCall::Test(key, candidates) => Ok(Value::Bool(self.is(key, candidates))),
            AttrCall::Set(key, value) => {
                self.set(key, value.clone());
                Ok(value)
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Accessor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { entries }
    }
}
