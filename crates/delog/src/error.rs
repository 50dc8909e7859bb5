use thiserror::Error;

/// Every failure the rule engine can report.
///
/// Nothing inside the engine recovers locally: a rule, addin or delegate
/// error aborts the parse of that line and surfaces here.
#[derive(Debug, Error)]
pub enum DelogError {
    /// A sandboxed block called an operation that is not on the whitelist.
    #[error("undefined operation `{operation}' for sandboxed context")]
    Capability { operation: String },

    /// Parser type definition is invalid (unknown addin, unsupported
    /// whitelist entry, malformed rule shape, unknown parser selector).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Attempt to mutate a finished record.
    #[error("Modification error: {0}")]
    Modification(String),

    /// Input source could not be opened or read.
    #[error("Source error: {0}")]
    Source(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid timestamp: {0}")]
    Time(#[from] chrono::ParseError),

    /// Attribute-style call with too many arguments.
    #[error("wrong number of arguments for `{name}' (given {given}, expected 0..1)")]
    Arity { name: String, given: usize },

    /// A whitelisted operation ran and failed.
    #[error("Operation `{operation}' failed: {message}")]
    Operation { operation: String, message: String },
}

impl DelogError {
    pub fn configuration(message: impl Into<String>) -> Self {
        DelogError::Configuration(message.into())
    }

    pub fn operation(operation: &str, message: impl Into<String>) -> Self {
        DelogError::Operation {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn is_capability(&self) -> bool {
        matches!(self, DelogError::Capability { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DelogError::Configuration(_))
    }

    pub fn is_modification(&self) -> bool {
        matches!(self, DelogError::Modification(_))
    }
}
