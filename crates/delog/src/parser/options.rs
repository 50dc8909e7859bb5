use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::DelogError;
use crate::parser::{ParserCache, ParserType};

pub const DEFAULT_PARSER: &str = "basic";

/// Which parser type a line is parsed with.
#[derive(Clone)]
pub enum ParserSelector {
    /// Resolved through the process-wide [`ParserCache`].
    Named(String),
    Type(Arc<ParserType>),
}

impl fmt::Debug for ParserSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserSelector::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ParserSelector::Type(kind) => f.debug_tuple("Type").field(&kind.name()).finish(),
        }
    }
}

impl From<&str> for ParserSelector {
    fn from(name: &str) -> Self {
        ParserSelector::Named(name.to_string())
    }
}

impl From<Arc<ParserType>> for ParserSelector {
    fn from(kind: Arc<ParserType>) -> Self {
        ParserSelector::Type(kind)
    }
}

/// Read-only configuration handed to every parser instance.
#[derive(Debug, Clone)]
pub struct Options {
    parser: ParserSelector,
    settings: BTreeMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        Self::new(ParserSelector::Named(DEFAULT_PARSER.to_string()))
    }
}

impl Options {
    pub fn new(parser: impl Into<ParserSelector>) -> Self {
        Self {
            parser: parser.into(),
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn with_settings<I, K, V>(mut self, settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.settings
            .extend(settings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }

    pub fn parser(&self) -> &ParserSelector {
        &self.parser
    }

    pub fn resolve_parser(&self) -> Result<Arc<ParserType>, DelogError> {
        match &self.parser {
            ParserSelector::Named(name) => ParserCache::global().get_or_define(name),
            ParserSelector::Type(kind) => Ok(Arc::clone(kind)),
        }
    }
}
