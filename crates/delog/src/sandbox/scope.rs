use std::sync::Arc;

use tracing::{trace, warn};

use crate::accessor::Accessor;
use crate::engine::{Record, Rule};
use crate::error::DelogError;
use crate::parser::Options;
use crate::sandbox::Surface;
use crate::value::{Key, Value};

/// One instance of a compiled surface, bound to the record being built.
///
/// This is the only handle sandboxed code receives. The record primitives
/// are always available; anything else goes through [`Scope::call`] and
/// must be on the surface.
pub struct Scope<'a> {
    surface: Arc<Surface>,
    record: &'a mut Record,
    line: &'a str,
    options: &'a Options,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        surface: Arc<Surface>,
        record: &'a mut Record,
        line: &'a str,
        options: &'a Options,
    ) -> Self {
        Self {
            surface,
            record,
            line,
            options,
        }
    }

    /// The raw line being parsed.
    pub fn line(&self) -> &'a str {
        self.line
    }

    /// A read-only parser setting from the configuration.
    pub fn option(&self, name: &str) -> Option<&'a str> {
        let options: &'a Options = self.options;
        options.setting(name)
    }

    pub fn get(&self, name: impl Into<Key>) -> Option<&Value> {
        self.record.get(name)
    }

    pub fn get_str(&self, name: impl Into<Key>) -> Option<&str> {
        self.record.get(name).and_then(Value::as_str)
    }

    /// Owned value for `name`, `Value::Nil` when absent.
    pub fn value(&self, name: impl Into<Key>) -> Value {
        self.record.get(name).cloned().unwrap_or_default()
    }

    pub fn has_key(&self, name: impl Into<Key>) -> bool {
        self.record.has_key(name)
    }

    /// Merge `name => value` into the record. No-op once stopped.
    pub fn set(&mut self, name: impl Into<Key>, value: impl Into<Value>) {
        self.record.set(name, value);
    }

    pub fn del(&mut self, name: impl Into<Key>) -> Option<Value> {
        self.record.del(name)
    }

    /// End rule evaluation for this line.
    pub fn stop(&mut self) {
        self.record.stop();
    }

    pub fn stopped(&self) -> bool {
        self.record.is_stopped()
    }

    pub fn data(&self) -> &Accessor {
        self.record.data()
    }

    /// Attribute-style access on the record: `name()` reads, `name(v)`
    /// writes, `name?(..)` tests.
    pub fn attr(&mut self, name: &str, args: &[Value]) -> Result<Value, DelogError> {
        self.record.attr(name, args)
    }

    /// Evaluate `rule` against this line. Returns whether it matched.
    pub fn on(&mut self, rule: &Rule) -> Result<bool, DelogError> {
        rule.apply(self)
    }

    pub fn allows(&self, operation: &str) -> bool {
        self.surface.allows(operation)
    }

    /// Forward `operation` to its bound receiver.
    ///
    /// A name missing from the surface is a capability violation: the
    /// error is returned and the record is marked so the parse fails even
    /// if the caller ignores it.
    pub fn call(&mut self, operation: &str, args: &[Value]) -> Result<Value, DelogError> {
        let receiver = match self.surface.receiver(operation) {
            Ok(receiver) => receiver,
            Err(err) => {
                warn!(operation, "call to operation outside the sandbox whitelist");
                self.record.flag_violation(operation);
                return Err(err);
            }
        };

        trace!(operation, receiver = receiver.label(), "forwarding sandboxed call");
        receiver.invoke(operation, self, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{Context, Operations};
    use crate::value::sym;

    fn context() -> Context {
        let ops = Operations::new("helpers")
            .with("whitelisted_method", |scope, _| {
                scope.set("hello", sym("world"));
                Ok(Value::Bool(true))
            })
            .into_receiver();
        let mut context = Context::new();
        context.add_method("whitelisted_method", ops);
        context
    }

    #[test]
    fn test_call_forwards_to_receiver() {
        let mut context = context();
        let mut record = Record::new();

        let value = context
            .run(&mut record, "W bar\n", &Options::default(), |scope| {
                scope.call("whitelisted_method", &[])
            })
            .unwrap();

        assert_eq!(value, Value::Bool(true));
        assert_eq!(record.get("hello"), Some(&sym("world")));
    }

    #[test]
    fn test_call_outside_whitelist_poisons_record() {
        let mut context = context();
        let mut record = Record::new();

        context
            .run(&mut record, "NW bar\n", &Options::default(), |scope| {
                // swallowed on purpose
                let _ = scope.call("not_whitelisted_method", &[]);
                Ok(())
            })
            .unwrap();

        assert_eq!(record.violation(), Some("not_whitelisted_method"));
    }

    #[test]
    fn test_primitives_respect_stop() {
        let mut context = context();
        let mut record = Record::new();

        context
            .run(&mut record, "", &Options::default(), |scope| {
                scope.set("before", 1i64);
                scope.stop();
                scope.set("after", 2i64);
                assert!(scope.stopped());
                Ok(())
            })
            .unwrap();

        assert!(record.has_key("before"));
        assert!(!record.has_key("after"));
    }

    #[test]
    fn test_option_reads_settings() {
        let mut context = context();
        let mut record = Record::new();
        let options = Options::default().with_setting("server", "tf2");

        let server = context
            .run(&mut record, "", &options, |scope| Ok(scope.option("server").map(str::to_string)))
            .unwrap();

        assert_eq!(server.as_deref(), Some("tf2"));
    }
}
