/// Built-in parser types

pub mod basic;

use crate::error::DelogError;
use crate::parser::ParserType;

/// Names of the built-in parser types.
pub const BUILTIN: &[&str] = &[basic::NAME];

/// Define the built-in parser type named `name` (snake_case).
pub fn lookup(name: &str) -> Result<ParserType, DelogError> {
    match name {
        basic::NAME => basic::definition(),
        other => Err(DelogError::configuration(format!(
            "unknown parser `{}' (built-in parsers: {})",
            other,
            BUILTIN.join(", ")
        ))),
    }
}
