/// Addins: reusable bundles of whitelisted operations plus a setup hook
///
/// An addin is composed into a parser type at definition time. For every
/// parser instance it contributes its operations to the sandbox binding
/// table and then runs its setup routine inside the sandbox, before the
/// parser's own rules.

pub mod date_time;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use heck::ToUpperCamelCase;
use tracing::debug;

use crate::error::DelogError;
use crate::sandbox::{Receiver, Scope};
use crate::value::Value;

pub use date_time::{parse_time, DateTimeAddin};

/// The implementing unit behind an addin.
pub trait AddinUnit: Send + Sync {
    /// Canonical (CamelCase) registry name.
    fn name(&self) -> &str;

    /// Operations this unit exposes to sandboxed code.
    fn whitelist(&self) -> &[&'static str] {
        &[]
    }

    fn responds_to(&self, operation: &str) -> bool;

    fn invoke(
        &self,
        operation: &str,
        scope: &mut Scope<'_>,
        args: &[Value],
    ) -> Result<Value, DelogError>;

    /// One-shot hook run inside the sandbox before the rule block. Must not
    /// overwrite keys the record already carries.
    fn setup(&self, _scope: &mut Scope<'_>) -> Result<(), DelogError> {
        Ok(())
    }
}

/// How a parser type names an addin: by registry identifier or directly.
#[derive(Clone)]
pub enum AddinRef {
    Name(String),
    Unit(Arc<dyn AddinUnit>),
}

impl From<&str> for AddinRef {
    fn from(name: &str) -> Self {
        AddinRef::Name(name.to_string())
    }
}

impl From<String> for AddinRef {
    fn from(name: String) -> Self {
        AddinRef::Name(name)
    }
}

impl From<Arc<dyn AddinUnit>> for AddinRef {
    fn from(unit: Arc<dyn AddinUnit>) -> Self {
        AddinRef::Unit(unit)
    }
}

impl fmt::Debug for AddinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddinRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
            AddinRef::Unit(unit) => f.debug_tuple("Unit").field(&unit.name()).finish(),
        }
    }
}

/// A resolved addin, shared by every instance of the parser type that
/// declared it.
#[derive(Clone)]
pub struct Addin {
    unit: Arc<dyn AddinUnit>,
}

impl Addin {
    /// Resolve `reference` and check that the unit really supports every
    /// operation it whitelists.
    pub fn resolve(reference: AddinRef, registry: &AddinRegistry) -> Result<Self, DelogError> {
        let unit = match reference {
            AddinRef::Name(name) => registry.lookup(&name)?,
            AddinRef::Unit(unit) => unit,
        };

        for operation in unit.whitelist() {
            if !unit.responds_to(operation) {
                return Err(DelogError::configuration(format!(
                    "addin {} whitelists `{}' but does not support it",
                    unit.name(),
                    operation
                )));
            }
        }

        debug!(addin = unit.name(), operations = unit.whitelist().len(), "addin resolved");
        Ok(Self { unit })
    }

    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn operations(&self) -> &[&'static str] {
        self.unit.whitelist()
    }

    pub fn setup(&self, scope: &mut Scope<'_>) -> Result<(), DelogError> {
        self.unit.setup(scope)
    }

    /// This addin as the receiver its operations are bound to.
    pub fn receiver(&self) -> Arc<dyn Receiver> {
        Arc::new(self.clone())
    }
}

impl Receiver for Addin {
    fn label(&self) -> &str {
        self.unit.name()
    }

    fn responds_to(&self, operation: &str) -> bool {
        self.unit.responds_to(operation)
    }

    fn invoke(
        &self,
        operation: &str,
        scope: &mut Scope<'_>,
        args: &[Value],
    ) -> Result<Value, DelogError> {
        self.unit.invoke(operation, scope, args)
    }
}

impl fmt::Debug for Addin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addin")
            .field("name", &self.unit.name())
            .field("operations", &self.unit.whitelist())
            .finish()
    }
}

/// Namespace addin names are looked up in.
#[derive(Default)]
pub struct AddinRegistry {
    units: HashMap<String, Arc<dyn AddinUnit>>,
}

impl AddinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in addins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DateTimeAddin));
        registry
    }

    /// The shared built-in registry.
    pub fn builtin() -> Arc<AddinRegistry> {
        static BUILTIN: OnceLock<Arc<AddinRegistry>> = OnceLock::new();
        Arc::clone(BUILTIN.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    pub fn register(&mut self, unit: Arc<dyn AddinUnit>) {
        self.units.insert(unit.name().to_string(), unit);
    }

    /// Look up `name`. Identifiers that do not start with an uppercase
    /// letter are taken as snake_case and converted first.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn AddinUnit>, DelogError> {
        let canonical = canonical_name(name);
        self.units.get(&canonical).cloned().ok_or_else(|| {
            DelogError::configuration(format!("uninitialized constant {} (addin `{}')", canonical, name))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}

impl fmt::Debug for AddinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddinRegistry")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn canonical_name(name: &str) -> String {
    if name.starts_with(|c: char| c.is_ascii_uppercase()) {
        name.to_string()
    } else {
        name.to_upper_camel_case()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Record;
    use crate::parser::Options;
    use crate::sandbox::Context;

    struct TestAddin;

    impl AddinUnit for TestAddin {
        fn name(&self) -> &str {
            "TestAddin"
        }

        fn whitelist(&self) -> &[&'static str] {
            &["some_method"]
        }

        fn responds_to(&self, operation: &str) -> bool {
            operation == "some_method"
        }

        fn invoke(&self, _: &str, _: &mut Scope<'_>, _: &[Value]) -> Result<Value, DelogError> {
            Ok(Value::from("some value"))
        }
    }

    struct Broken;

    impl AddinUnit for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn whitelist(&self) -> &[&'static str] {
            &["missing"]
        }

        fn responds_to(&self, _: &str) -> bool {
            false
        }

        fn invoke(&self, op: &str, _: &mut Scope<'_>, _: &[Value]) -> Result<Value, DelogError> {
            Err(DelogError::operation(op, "unsupported"))
        }
    }

    // ── Name resolution ─────────────────────────────────────────────

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("date_time"), "DateTime");
        assert_eq!(canonical_name("DateTime"), "DateTime");
        assert_eq!(canonical_name("test_addin"), "TestAddin");
    }

    #[test]
    fn test_lookup_builtin_by_snake_case() {
        let registry = AddinRegistry::builtin();
        let unit = registry.lookup("date_time").unwrap();
        assert_eq!(unit.name(), "DateTime");
    }

    #[test]
    fn test_unknown_addin_is_configuration_error() {
        let registry = AddinRegistry::builtin();
        let err = Addin::resolve(AddinRef::from("no_such_addin"), &registry).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_direct_reference_bypasses_registry() {
        let registry = AddinRegistry::new();
        let unit: Arc<dyn AddinUnit> = Arc::new(TestAddin);
        let addin = Addin::resolve(unit.into(), &registry).unwrap();
        assert_eq!(addin.name(), "TestAddin");
        assert_eq!(addin.operations(), &["some_method"]);
    }

    #[test]
    fn test_unsupported_whitelist_entry_fails_fast() {
        let unit: Arc<dyn AddinUnit> = Arc::new(Broken);
        let err = Addin::resolve(unit.into(), &AddinRegistry::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    // ── Sandbox integration ─────────────────────────────────────────

    #[test]
    fn test_addin_operations_reachable_through_sandbox() {
        let mut registry = AddinRegistry::new();
        registry.register(Arc::new(TestAddin));
        let addin = Addin::resolve(AddinRef::from("test_addin"), &registry).unwrap();

        let mut context = Context::new();
        for operation in addin.operations() {
            context.add_method(*operation, addin.receiver());
        }
        let mut record = Record::new();

        let value = context
            .run(&mut record, "hello world", &Options::default(), |scope| {
                scope.call("some_method", &[])
            })
            .unwrap();
        assert_eq!(value, Value::from("some value"));
    }
}
