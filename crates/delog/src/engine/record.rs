use serde::Serialize;

use crate::accessor::{Accessor, AttrCall};
use crate::error::DelogError;
use crate::value::{Key, Value};

/// Key/value data accumulated for one line while it is being parsed.
///
/// Once `stop` is called every further write (`set`, `del`, attribute
/// writes) is dropped for the rest of the parse.
#[derive(Debug, Clone, Default)]
pub struct Record {
    data: Accessor,
    stopped: bool,
    violation: Option<String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh record seeded with `presets`.
    pub fn with_presets<'p>(presets: impl IntoIterator<Item = &'p (Key, Value)>) -> Self {
        let mut record = Self::new();
        for (key, value) in presets {
            record.data.set(key.clone(), value.clone());
        }
        record
    }

    pub fn get(&self, name: impl Into<Key>) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn has_key(&self, name: impl Into<Key>) -> bool {
        self.data.has_key(name)
    }

    pub fn set(&mut self, name: impl Into<Key>, value: impl Into<Value>) {
        if self.stopped {
            return;
        }
        self.data.set(name, value);
    }

    pub fn del(&mut self, name: impl Into<Key>) -> Option<Value> {
        if self.stopped {
            return None;
        }
        self.data.remove(name)
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn attr(&mut self, name: &str, args: &[Value]) -> Result<Value, DelogError> {
        match AttrCall::classify(name, args)? {
            AttrCall::Get(key) => Ok(self.data.value(key)),
            AttrCall::Test(key, candidates) => Ok(Value::Bool(self.data.is(key, candidates))),
            AttrCall::Set(key, value) => {
                self.set(key, value.clone());
                Ok(value)
            }
        }
    }

    pub fn data(&self) -> &Accessor {
        &self.data
    }

    /// First operation called outside the whitelist during this parse.
    pub fn violation(&self) -> Option<&str> {
        self.violation.as_deref()
    }

    pub(crate) fn flag_violation(&mut self, operation: &str) {
        if self.violation.is_none() {
            self.violation = Some(operation.to_string());
        }
    }

    /// Finish the parse and hand out the read-only view.
    pub fn freeze(self) -> Data {
        Data(self.data)
    }
}

/// A finished record. Readable through the flexible accessor rules;
/// every write attempt fails with [`DelogError::Modification`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Data(Accessor);

impl Data {
    pub fn get(&self, name: impl Into<Key>) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: impl Into<Key>) -> Option<&str> {
        self.0.get_str(name)
    }

    pub fn value(&self, name: impl Into<Key>) -> Value {
        self.0.value(name)
    }

    pub fn has_key(&self, name: impl Into<Key>) -> bool {
        self.0.has_key(name)
    }

    pub fn is(&self, name: impl Into<Key>, candidates: &[Value]) -> bool {
        self.0.is(name, candidates)
    }

    /// Attribute-style reads and tests; writes are refused.
    pub fn attr(&self, name: &str, args: &[Value]) -> Result<Value, DelogError> {
        match AttrCall::classify(name, args)? {
            AttrCall::Get(key) => Ok(self.0.value(key)),
            AttrCall::Test(key, candidates) => Ok(Value::Bool(self.0.is(key, candidates))),
            AttrCall::Set(key, _) => Err(modification(&key)),
        }
    }

    pub fn set(&self, name: impl Into<Key>, _value: impl Into<Value>) -> Result<(), DelogError> {
        Err(modification(&name.into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_accessor(&self) -> &Accessor {
        &self.0
    }
}

fn modification(key: &Key) -> DelogError {
    DelogError::Modification(format!("cannot set {} on a parsed line", key))
}
