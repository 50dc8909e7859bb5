// Module structure for delog: a rule-driven, sandboxed log line parser.

// Core data model
pub mod accessor;
pub mod error;
pub mod value;

// Rule evaluation
pub mod addin;
pub mod engine;
pub mod parser;
pub mod sandbox;

// Outer layers
pub mod conf;
pub mod logfile;
pub mod runtime;

pub use accessor::Accessor;
pub use engine::{d, Data, Pairs, Record, RuleSet, Subject};
pub use error::DelogError;
pub use logfile::{Line, Log};
pub use parser::{LineParser, Options, ParserType};
pub use value::{sym, Key, Value};
