use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::engine::Data;
use crate::error::DelogError;
use crate::parser::{LineParser, Options};
use crate::value::{Key, Value};

/// One line of a log.
///
/// Parsed on first access to [`Line::data`] with the parser its options
/// select; the result is cached. Lines order and compare by their ordinal
/// only, never by parsed content.
#[derive(Clone)]
pub struct Line {
    number: usize,
    text: String,
    options: Arc<Options>,
    data: OnceLock<Data>,
}

impl Line {
    pub fn new(text: impl Into<String>, number: usize, options: Arc<Options>) -> Self {
        Self {
            number,
            text: text.into(),
            options,
            data: OnceLock::new(),
        }
    }

    /// 0-based position in the source.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Raw text, line terminator included.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }

    /// The parsed record. Failures are returned and not cached.
    pub fn data(&self) -> Result<&Data, DelogError> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }

        let mut parser = LineParser::from_options(self.text.as_str(), Arc::clone(&self.options))?;
        let data = parser.parse()?.clone();
        Ok(self.data.get_or_init(|| data))
    }

    pub fn get(&self, name: impl Into<Key>) -> Result<Option<&Value>, DelogError> {
        Ok(self.data()?.get(name))
    }

    /// Attribute-style read or test on the parsed record.
    pub fn attr(&self, name: &str, args: &[Value]) -> Result<Value, DelogError> {
        self.data()?.attr(name, args)
    }

    /// Lines are immutable.
    pub fn set(&self, _name: impl Into<Key>, _value: impl Into<Value>) -> Result<(), DelogError> {
        Err(DelogError::Modification("cannot modify a line directly".to_string()))
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Line {}

impl PartialOrd for Line {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Line {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.number, self.text)
    }
}
