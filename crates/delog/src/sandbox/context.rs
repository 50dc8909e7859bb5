use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::engine::Record;
use crate::error::DelogError;
use crate::parser::Options;
use crate::sandbox::{Receiver, Scope, Surface};

/// Sandbox state owned by one parser instance.
///
/// Holds the binding table and lazily compiles it into a [`Surface`].
/// Every mutation of the table drops both the compiled surface and the
/// current instance; the next `compile`/`run` builds a fresh one.
#[derive(Default)]
pub struct Context {
    table: IndexMap<String, Arc<dyn Receiver>>,
    compiled: Option<Arc<Surface>>,
    current: Option<Arc<Surface>>,
    version: u64,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `receiver`.
    pub fn add_method(&mut self, name: impl Into<String>, receiver: Arc<dyn Receiver>) {
        self.table.insert(name.into(), receiver);
        self.invalidate();
    }

    pub fn remove_method(&mut self, name: &str) -> Option<Arc<dyn Receiver>> {
        let removed = self.table.shift_remove(name);
        self.invalidate();
        removed
    }

    /// Forget the compiled surface and the current instance.
    pub fn invalidate(&mut self) {
        self.compiled = None;
        self.current = None;
        self.version += 1;
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// The surface for the current binding table, compiling it if the table
    /// changed since the last compile.
    pub fn compile(&mut self) -> Result<Arc<Surface>, DelogError> {
        if let Some(surface) = &self.compiled {
            return Ok(Arc::clone(surface));
        }

        let surface = Arc::new(Surface::compile(&self.table, self.version)?);
        self.compiled = Some(Arc::clone(&surface));
        Ok(surface)
    }

    /// Run `block` against a fresh instance of the compiled surface, which
    /// becomes the current instance. Errors from the block propagate as-is.
    pub fn run<R>(
        &mut self,
        record: &mut Record,
        line: &str,
        options: &Options,
        block: impl FnOnce(&mut Scope<'_>) -> Result<R, DelogError>,
    ) -> Result<R, DelogError> {
        let surface = self.compile()?;
        self.current = Some(Arc::clone(&surface));

        let mut scope = Scope::new(surface, record, line, options);
        block(&mut scope)
    }

    /// Re-enter the current instance. Without one this does nothing and
    /// returns `Ok(None)`.
    pub fn run_with_current<R>(
        &self,
        record: &mut Record,
        line: &str,
        options: &Options,
        block: impl FnOnce(&mut Scope<'_>) -> Result<R, DelogError>,
    ) -> Result<Option<R>, DelogError> {
        let Some(surface) = &self.current else {
            debug!("no current sandbox instance; skipping block");
            return Ok(None);
        };

        let mut scope = Scope::new(Arc::clone(surface), record, line, options);
        block(&mut scope).map(Some)
    }

    pub fn current(&self) -> Option<&Arc<Surface>> {
        self.current.as_ref()
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Operations;
    use crate::value::Value;

    fn helpers() -> Arc<dyn Receiver> {
        Operations::new("helpers")
            .with("some_method", |_, _| Ok(Value::from("foobar")))
            .into_receiver()
    }

    #[test]
    fn test_run_calls_whitelisted_method() {
        let mut context = Context::new();
        context.add_method("some_method", helpers());
        let mut record = Record::new();

        let value = context
            .run(&mut record, "line", &Options::default(), |scope| scope.call("some_method", &[]))
            .unwrap();

        assert_eq!(value, Value::from("foobar"));
    }

    #[test]
    fn test_run_propagates_block_errors() {
        let mut context = Context::new();
        let mut record = Record::new();

        let result: Result<(), _> = context.run(&mut record, "", &Options::default(), |_| {
            Err(DelogError::operation("block", "boom"))
        });

        assert!(matches!(result, Err(DelogError::Operation { .. })));
    }

    #[test]
    fn test_mutation_invalidates_surface() {
        let mut context = Context::new();
        context.add_method("some_method", helpers());
        let first = context.compile().unwrap();
        assert!(context.is_compiled());

        context.remove_method("some_method");
        assert!(!context.is_compiled());
        assert!(context.current().is_none());

        let second = context.compile().unwrap();
        assert!(first.allows("some_method"));
        assert!(!second.allows("some_method"));
        assert!(second.version() > first.version());
    }

    #[test]
    fn test_compile_is_cached_while_clean() {
        let mut context = Context::new();
        context.add_method("some_method", helpers());

        let a = context.compile().unwrap();
        let b = context.compile().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_run_with_current_without_instance_is_noop() {
        let context = Context::new();
        let mut record = Record::new();

        let result = context
            .run_with_current(&mut record, "", &Options::default(), |scope| {
                scope.set("touched", true);
                Ok(())
            })
            .unwrap();

        assert!(result.is_none());
        assert!(!record.has_key("touched"));
    }

    #[test]
    fn test_run_with_current_reenters_last_instance() {
        let mut context = Context::new();
        context.add_method("some_method", helpers());
        let mut record = Record::new();
        let options = Options::default();

        context.run(&mut record, "", &options, |_| Ok(())).unwrap();
        let value = context
            .run_with_current(&mut record, "", &options, |scope| scope.call("some_method", &[]))
            .unwrap();

        assert_eq!(value, Some(Value::from("foobar")));
    }

    #[test]
    fn test_compile_fails_for_unsupported_binding() {
        let mut context = Context::new();
        context.add_method("not_there", helpers());

        let err = context.compile().unwrap_err();
        assert!(err.is_configuration());
    }
}
