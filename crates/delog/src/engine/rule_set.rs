use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::accessor::Accessor;
use crate::engine::rule::{DataArg, MappingEntry, MatchArg, Pairs, Rule, RuleBlock, Subject};
use crate::error::DelogError;
use crate::sandbox::Scope;
use crate::value::{Key, Value};

pub type ScopeBlock = dyn Fn(&mut Scope<'_>) -> Result<(), DelogError> + Send + Sync;

/// One step of a parser's rule block.
#[derive(Clone)]
pub enum Statement {
    On(Rule),
    Set(Key, Value),
    Stop,
    /// A whitelisted operation called for its side effects.
    Call(String, Vec<Value>),
    /// Arbitrary sandboxed code.
    Run(Arc<ScopeBlock>),
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::On(rule) => f.debug_tuple("On").field(&rule.pattern().as_str()).finish(),
            Statement::Set(key, value) => f.debug_tuple("Set").field(key).field(value).finish(),
            Statement::Stop => f.write_str("Stop"),
            Statement::Call(name, args) => f.debug_tuple("Call").field(name).field(args).finish(),
            Statement::Run(_) => f.write_str("Run(..)"),
        }
    }
}

/// The ordered, immutable rule block of a parser type. Built once and
/// shared by every parse of that type.
#[derive(Debug, Clone)]
pub struct RuleSet {
    statements: Arc<[Statement]>,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSetBuilder::default().build()
    }
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Run every statement in declaration order.
    pub fn evaluate(&self, scope: &mut Scope<'_>) -> Result<(), DelogError> {
        for statement in self.statements.iter() {
            match statement {
                Statement::On(rule) => {
                    scope.on(rule)?;
                }
                Statement::Set(key, value) => scope.set(key.clone(), value.clone()),
                Statement::Stop => scope.stop(),
                Statement::Call(operation, args) => {
                    scope.call(operation, args)?;
                }
                Statement::Run(block) => block(scope)?,
            }
        }
        Ok(())
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Collects statements while a parser type is being defined.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    statements: Vec<Statement>,
}

impl RuleSetBuilder {
    /// `on pattern, key => value, ...`
    pub fn on(&mut self, pattern: &str, pairs: Pairs) -> Result<&mut Self, DelogError> {
        self.rule(MatchArg::Pattern(Regex::new(pattern)?), pairs.into(), None)
    }

    /// `on pattern => subject, key => value, ...`
    pub fn on_subject(
        &mut self,
        pattern: &str,
        subject: Subject,
        pairs: Pairs,
    ) -> Result<&mut Self, DelogError> {
        let mut entries = vec![MappingEntry::Subject(Regex::new(pattern)?, subject)];
        entries.extend(
            pairs
                .iter()
                .map(|(key, value)| MappingEntry::Pair(key.clone(), value.clone())),
        );
        self.rule(MatchArg::Mapping(entries), DataArg::None, None)
    }

    /// `on pattern, :operation`
    pub fn on_call(&mut self, pattern: &str, operation: &str) -> Result<&mut Self, DelogError> {
        self.rule(
            MatchArg::Pattern(Regex::new(pattern)?),
            DataArg::Operation(operation.to_string()),
            None,
        )
    }

    /// `on pattern do |m| ... end`
    pub fn on_block<F>(&mut self, pattern: &str, block: F) -> Result<&mut Self, DelogError>
    where
        F: Fn(&mut Scope<'_>, &Accessor) -> Result<(), DelogError> + Send + Sync + 'static,
    {
        let block: Arc<RuleBlock> = Arc::new(block);
        self.rule(MatchArg::Pattern(Regex::new(pattern)?), DataArg::None, Some(block))
    }

    /// Any call shape; see [`Rule::normalize`].
    pub fn rule(
        &mut self,
        match_arg: MatchArg,
        data: DataArg,
        block: Option<Arc<RuleBlock>>,
    ) -> Result<&mut Self, DelogError> {
        let rule = Rule::normalize(match_arg, data, block)?;
        self.statements.push(Statement::On(rule));
        Ok(self)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.statements.push(Statement::Set(Key::sym(name), value.into()));
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.statements.push(Statement::Stop);
        self
    }

    pub fn call(&mut self, operation: &str, args: Vec<Value>) -> &mut Self {
        self.statements.push(Statement::Call(operation.to_string(), args));
        self
    }

    pub fn run<F>(&mut self, block: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>) -> Result<(), DelogError> + Send + Sync + 'static,
    {
        self.statements.push(Statement::Run(Arc::new(block)));
        self
    }

    pub fn build(self) -> RuleSet {
        RuleSet {
            statements: self.statements.into(),
        }
    }
}
