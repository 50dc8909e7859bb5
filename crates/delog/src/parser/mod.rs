/// Parser types and per-line parser instances
///
/// A [`ParserType`] is defined once: its whitelist, addins, presets and the
/// immutable [`RuleSet`]. A [`LineParser`] is the per-line instance that
/// owns a fresh record and sandbox and runs the type's rules.
///
/// # Architecture
///
/// - `options.rs`: read-only configuration and parser selection
/// - `line_parser.rs`: activation (whitelist + addins) and `parse`
/// - `cache.rs`: process-wide cache of parser type definitions
/// - `formats/`: built-in parser types

pub mod cache;
pub mod formats;
pub mod line_parser;
pub mod options;

pub use cache::ParserCache;
pub use line_parser::LineParser;
pub use options::{Options, ParserSelector, DEFAULT_PARSER};

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::addin::{Addin, AddinRef, AddinRegistry};
use crate::engine::{RuleSet, RuleSetBuilder};
use crate::error::DelogError;
use crate::sandbox::{Context, Receiver};
use crate::value::{Key, Value};

/// An immutable parser definition, shared by every line parsed with it.
pub struct ParserType {
    name: String,
    whitelist: Vec<(String, Arc<dyn Receiver>)>,
    addins: Vec<Addin>,
    presets: Vec<(Key, Value)>,
    rules: RuleSet,
}

impl ParserType {
    pub fn builder(name: impl Into<String>) -> ParserTypeBuilder {
        ParserTypeBuilder {
            name: name.into(),
            whitelist: Vec::new(),
            addins: Vec::new(),
            presets: Vec::new(),
            registry: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn whitelist(&self) -> impl Iterator<Item = (&str, &Arc<dyn Receiver>)> {
        self.whitelist
            .iter()
            .map(|(operation, receiver)| (operation.as_str(), receiver))
    }

    pub fn addins(&self) -> &[Addin] {
        &self.addins
    }

    pub fn presets(&self) -> &[(Key, Value)] {
        &self.presets
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl fmt::Debug for ParserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserType")
            .field("name", &self.name)
            .field(
                "whitelist",
                &self.whitelist.iter().map(|(op, _)| op).collect::<Vec<_>>(),
            )
            .field("addins", &self.addins)
            .field("presets", &self.presets)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Definition-time state of a parser type.
pub struct ParserTypeBuilder {
    name: String,
    whitelist: Vec<(String, Arc<dyn Receiver>)>,
    addins: Vec<AddinRef>,
    presets: Vec<(Key, Value)>,
    registry: Option<Arc<AddinRegistry>>,
}

impl ParserTypeBuilder {
    /// Expose `operation` of `receiver` to rule code.
    pub fn whitelist(mut self, operation: impl Into<String>, receiver: Arc<dyn Receiver>) -> Self {
        self.whitelist.push((operation.into(), receiver));
        self
    }

    /// Expose several operations of the same receiver.
    pub fn whitelist_all(mut self, receiver: Arc<dyn Receiver>, operations: &[&str]) -> Self {
        for operation in operations {
            self.whitelist
                .push((operation.to_string(), Arc::clone(&receiver)));
        }
        self
    }

    pub fn addin(mut self, addin: impl Into<AddinRef>) -> Self {
        self.addins.push(addin.into());
        self
    }

    /// Registry addin names are resolved against. Defaults to the built-in one.
    pub fn registry(mut self, registry: Arc<AddinRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Seed every fresh record with `name => value`.
    pub fn preset(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.presets.push((Key::sym(name), value.into()));
        self
    }

    /// Declare the rule block and finish the definition.
    ///
    /// Addins are resolved and the whitelist compiled here, so an unknown
    /// addin or an unsupported operation fails before any line is parsed.
    pub fn build<F>(self, define: F) -> Result<ParserType, DelogError>
    where
        F: FnOnce(&mut RuleSetBuilder) -> Result<(), DelogError>,
    {
        let registry = self.registry.unwrap_or_else(AddinRegistry::builtin);
        let addins = self
            .addins
            .into_iter()
            .map(|reference| Addin::resolve(reference, &registry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut probe = Context::new();
        for (operation, receiver) in &self.whitelist {
            probe.add_method(operation.clone(), Arc::clone(receiver));
        }
        for addin in &addins {
            for operation in addin.operations() {
                probe.add_method(*operation, addin.receiver());
            }
        }
        probe.compile()?;

        let mut rules = RuleSet::builder();
        define(&mut rules)?;
        let rules = rules.build();

        debug!(
            parser = %self.name,
            rules = rules.len(),
            addins = addins.len(),
            "parser type defined"
        );

        Ok(ParserType {
            name: self.name,
            whitelist: self.whitelist,
            addins,
            presets: self.presets,
            rules,
        })
    }
}
