use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::accessor::Accessor;

/// A record key in one of its two textual forms.
///
/// `Str` is the plain string form; `Sym` is the interned/symbolic form used
/// by attribute-style access. Both carry the same name text, which is why
/// lookups probe each form in turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Str(String),
    Sym(String),
}

impl Key {
    pub fn str(name: impl Into<String>) -> Self {
        Key::Str(name.into())
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Key::Sym(normalize_symbol(&name.into()))
    }

    pub fn name(&self) -> &str {
        match self {
            Key::Str(name) | Key::Sym(name) => name,
        }
    }

    pub fn is_sym(&self) -> bool {
        matches!(self, Key::Sym(_))
    }

    /// The string form of this key.
    pub fn to_str_form(&self) -> Key {
        Key::Str(self.name().to_string())
    }

    /// The symbolic form of this key.
    pub fn to_sym_form(&self) -> Key {
        Key::sym(self.name())
    }
}

// Symbols are written with or without a leading colon.
fn normalize_symbol(name: &str) -> String {
    name.strip_prefix(':').unwrap_or(name).to_string()
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Str(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Str(name)
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
            Key::Str(name) => write!(f, "{:?}", name),
            Key::Sym(name) => write!(f, ":{}", name),
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// A value stored in a record or produced by a capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    Sym(String),
    Time(DateTime<Utc>),
    Map(Accessor),
}

/// Shorthand for a symbolic value such as `:comment`.
pub fn sym(name: impl Into<String>) -> Value {
    Value::Sym(normalize_symbol(&name.into()))
}

impl Value {
    /// Everything except `Nil` and `Bool(false)` counts as true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Text of a string or symbol value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) | Value::Sym(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Time(time) => Some(time),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Accessor> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Sym(s) => write!(f, ":{}", s),
            Value::Time(t) => f.write_str(&t.to_rfc3339()),
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} => {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Str(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Str(text)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(time: DateTime<Utc>) -> Self {
        Value::Time(time)
    }
}

impl From<Accessor> for Value {
    fn from(map: Accessor) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_forms_share_name() {
        let key = Key::str("hello");
        assert_eq!(key.to_sym_form(), Key::sym("hello"));
        assert_eq!(Key::sym(":hello").name(), "hello");
        assert_ne!(Key::str("hello"), Key::sym("hello"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(sym("comment").is_truthy());
    }

    #[test]
    fn test_serialize_symbols_and_nil() {
        let json = serde_json::to_string(&vec![sym("comment"), Value::Nil, Value::from(3i64)]).unwrap();
        assert_eq!(json, r#"["comment",null,3]"#);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<&str>), Value::Nil);
        assert_eq!(Value::from(Some("bar")), Value::Str("bar".to_string()));
    }
}
