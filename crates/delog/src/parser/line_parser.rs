use std::sync::Arc;

use tracing::debug;

use crate::engine::{Data, Record};
use crate::error::DelogError;
use crate::parser::{Options, ParserType};
use crate::sandbox::{Context, Scope};
use crate::value::{Key, Value};

/// One parse of one line.
///
/// Owns its record and sandbox; nothing here is shared with other lines.
/// `parse` evaluates at most once and afterwards hands out the cached,
/// read-only [`Data`].
pub struct LineParser {
    kind: Arc<ParserType>,
    line: String,
    options: Arc<Options>,
    presets: Vec<(Key, Value)>,
    record: Record,
    context: Context,
    activated: bool,
    data: Option<Data>,
}

impl LineParser {
    pub fn new(kind: Arc<ParserType>, line: impl Into<String>, options: Arc<Options>) -> Self {
        let record = Record::with_presets(kind.presets());
        Self {
            kind,
            line: line.into(),
            options,
            presets: Vec::new(),
            record,
            context: Context::new(),
            activated: false,
            data: None,
        }
    }

    /// Build an instance for the parser type `options` selects.
    pub fn from_options(line: impl Into<String>, options: Arc<Options>) -> Result<Self, DelogError> {
        let kind = options.resolve_parser()?;
        Ok(Self::new(kind, line, options))
    }

    /// Set `name => value` on this instance before it is parsed. Addin
    /// setups will not override it.
    pub fn preset(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let key = Key::sym(name);
        let value = value.into();
        self.record.set(key.clone(), value.clone());
        self.presets.push((key, value));
        self
    }

    pub fn kind(&self) -> &Arc<ParserType> {
        &self.kind
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_parsed(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Install the whitelist and run every addin's setup, in declaration
    /// order. Runs once per instance.
    pub fn activate(&mut self) -> Result<(), DelogError> {
        if self.activated {
            return Ok(());
        }

        for (operation, receiver) in self.kind.whitelist() {
            self.context.add_method(operation, Arc::clone(receiver));
        }
        self.context.compile()?;

        for addin in self.kind.addins() {
            for operation in addin.operations() {
                self.context.add_method(*operation, addin.receiver());
            }
            self.context.compile()?;
            self.context
                .run(&mut self.record, &self.line, &self.options, |scope| addin.setup(scope))?;
            debug!(parser = self.kind.name(), addin = addin.name(), "addin activated");
        }

        self.activated = true;
        Ok(())
    }

    /// Run the rules and return the finished record. A second call returns
    /// the cached result. On failure the instance starts over from its
    /// presets.
    pub fn parse(&mut self) -> Result<&Data, DelogError> {
        match self.data {
            Some(ref data) => Ok(data),
            None => match self.evaluate() {
                Ok(data) => Ok(self.data.insert(data)),
                Err(err) => {
                    self.reset();
                    Err(err)
                }
            },
        }
    }

    fn evaluate(&mut self) -> Result<Data, DelogError> {
        self.activate()?;

        let kind = Arc::clone(&self.kind);
        self.context
            .run(&mut self.record, &self.line, &self.options, |scope| {
                kind.rules().evaluate(scope)
            })?;

        if let Some(operation) = self.record.violation() {
            return Err(DelogError::Capability {
                operation: operation.to_string(),
            });
        }

        Ok(std::mem::take(&mut self.record).freeze())
    }

    fn reset(&mut self) {
        self.record = Record::with_presets(self.kind.presets().iter().chain(&self.presets));
        self.context = Context::new();
        self.activated = false;
    }

    /// Re-enter the current sandbox instance, if there is one. A parsed
    /// instance has no live record, so this returns `Ok(None)`.
    pub fn with_current<R>(
        &mut self,
        block: impl FnOnce(&mut Scope<'_>) -> Result<R, DelogError>,
    ) -> Result<Option<R>, DelogError> {
        if self.data.is_some() {
            debug!(parser = self.kind.name(), "instance already parsed; skipping block");
            return Ok(None);
        }
        self.context
            .run_with_current(&mut self.record, &self.line, &self.options, block)
    }
}
