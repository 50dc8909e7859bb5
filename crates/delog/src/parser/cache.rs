use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use heck::ToSnakeCase;
use tracing::debug;

use super::formats;
use super::ParserType;
use crate::error::DelogError;

/// Process-wide cache of parser type definitions
///
/// A parser type is defined once per selector and then shared, read-only,
/// by every line parsed with it. Built-in types are defined on first use;
/// user types are registered under a name.
#[derive(Debug, Default)]
pub struct ParserCache {
    /// selector (snake_case) → definition
    definitions: DashMap<String, Arc<ParserType>>,
}

impl ParserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static ParserCache {
        static CACHE: OnceLock<ParserCache> = OnceLock::new();
        CACHE.get_or_init(ParserCache::new)
    }

    /// The definition for `selector`, defining a built-in type if needed.
    pub fn get_or_define(&self, selector: &str) -> Result<Arc<ParserType>, DelogError> {
        let key = selector.to_snake_case();
        if let Some(kind) = self.definitions.get(&key) {
            return Ok(Arc::clone(kind.value()));
        }

        let kind = Arc::new(formats::lookup(&key)?);
        debug!(parser = %key, "parser type cached");
        // Another thread may have defined it meanwhile; keep the first one.
        let entry = self.definitions.entry(key).or_insert(kind);
        Ok(Arc::clone(entry.value()))
    }

    /// Register (or replace) a user-defined type.
    pub fn register(&self, name: &str, kind: Arc<ParserType>) {
        self.definitions.insert(name.to_snake_case(), kind);
    }

    pub fn get(&self, selector: &str) -> Option<Arc<ParserType>> {
        self.definitions
            .get(&selector.to_snake_case())
            .map(|kind| Arc::clone(kind.value()))
    }

    pub fn remove(&self, selector: &str) -> Option<Arc<ParserType>> {
        self.definitions
            .remove(&selector.to_snake_case())
            .map(|(_, kind)| kind)
    }

    pub fn clear(&self) {
        self.definitions.clear();
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
