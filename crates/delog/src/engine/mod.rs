/// Rule evaluation: records, rules and the ordered rule set of a parser type

pub mod record;
pub mod rule;
pub mod rule_set;

pub use record::{Data, Record};
pub use rule::{
    d, DataArg, Delegate, MappingEntry, MatchArg, Pairs, Pending, Rule, RuleBlock, Subject,
    STOP_MARKER,
};
pub use rule_set::{RuleSet, RuleSetBuilder, ScopeBlock, Statement};
