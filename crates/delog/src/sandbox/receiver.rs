use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::DelogError;
use crate::sandbox::Scope;
use crate::value::Value;

/// Something a whitelisted operation can be forwarded to.
///
/// A receiver may support more operations than a given surface exposes;
/// only whitelisted names are ever reachable from sandboxed code.
pub trait Receiver: Send + Sync {
    /// Name used in diagnostics.
    fn label(&self) -> &str;

    fn responds_to(&self, operation: &str) -> bool;

    fn invoke(
        &self,
        operation: &str,
        scope: &mut Scope<'_>,
        args: &[Value],
    ) -> Result<Value, DelogError>;
}

pub type OperationFn =
    dyn Fn(&mut Scope<'_>, &[Value]) -> Result<Value, DelogError> + Send + Sync;

/// A receiver assembled from named closures.
///
/// This is how parser authors provide their own helper operations:
///
/// ```ignore
/// let ops = Operations::new("test_parser")
///     .with("test_method", |scope, args| { scope.set("hello", sym("world")); Ok(Value::Nil) });
/// ```
#[derive(Clone)]
pub struct Operations {
    label: String,
    table: HashMap<String, Arc<OperationFn>>,
}

impl Operations {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            table: HashMap::new(),
        }
    }

    pub fn with<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> Result<Value, DelogError> + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(operation));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn into_receiver(self) -> Arc<dyn Receiver> {
        Arc::new(self)
    }
}

impl Receiver for Operations {
    fn label(&self) -> &str {
        &self.label
    }

    fn responds_to(&self, operation: &str) -> bool {
        self.table.contains_key(operation)
    }

    fn invoke(
        &self,
        operation: &str,
        scope: &mut Scope<'_>,
        args: &[Value],
    ) -> Result<Value, DelogError> {
        let f = self
            .table
            .get(operation)
            .ok_or_else(|| DelogError::Capability {
                operation: operation.to_string(),
            })?;
        f(scope, args)
    }
}

impl fmt::Debug for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Operations")
            .field("label", &self.label)
            .field("operations", &names)
            .finish()
    }
}
