use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::DelogError;
use crate::sandbox::Receiver;

/// Compiled capability set: operation name → bound receiver.
///
/// Immutable once built. A change to the binding table produces a new
/// surface with a higher `version`; an existing one is never patched.
#[derive(Clone)]
pub struct Surface {
    bindings: HashMap<String, Arc<dyn Receiver>>,
    version: u64,
}

impl Surface {
    /// Build from a binding table, checking that every receiver actually
    /// supports the operation it is bound for.
    pub fn compile(
        table: &IndexMap<String, Arc<dyn Receiver>>,
        version: u64,
    ) -> Result<Self, DelogError> {
        let mut bindings = HashMap::with_capacity(table.len());

        for (operation, receiver) in table {
            if !receiver.responds_to(operation) {
                return Err(DelogError::configuration(format!(
                    "undefined method `{}' for {}",
                    operation,
                    receiver.label()
                )));
            }
            bindings.insert(operation.clone(), Arc::clone(receiver));
        }

        debug!(version, operations = bindings.len(), "compiled sandbox surface");
        Ok(Self { bindings, version })
    }

    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
            version: 0,
        }
    }

    /// Receiver bound to `operation`, or a capability error.
    pub fn receiver(&self, operation: &str) -> Result<Arc<dyn Receiver>, DelogError> {
        self.bindings
            .get(operation)
            .cloned()
            .ok_or_else(|| DelogError::Capability {
                operation: operation.to_string(),
            })
    }

    pub fn allows(&self, operation: &str) -> bool {
        self.bindings.contains_key(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<&str> = self.operations().collect();
        operations.sort_unstable();
        f.debug_struct("Surface")
            .field("version", &self.version)
            .field("operations", &operations)
            .finish()
    }
}
