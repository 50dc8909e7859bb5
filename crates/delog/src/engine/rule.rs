use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::accessor::Accessor;
use crate::error::DelogError;
use crate::sandbox::Scope;
use crate::value::{Key, Value};

/// Key name that stops the parse when paired with a truthy value.
pub const STOP_MARKER: &str = "stop";

/// A pending pair value: either a literal, or a reference to a capture
/// group that is substituted when the pair is merged.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    Literal(Value),
    Capture(String),
}

/// Defer to the capture group `name` of the rule's own match.
pub fn d(name: impl Into<String>) -> Pending {
    Pending::Capture(name.into())
}

impl Pending {
    /// Truthiness of the raw pending value; a capture reference counts as
    /// true before it is resolved.
    pub fn is_truthy(&self) -> bool {
        match self {
            Pending::Literal(value) => value.is_truthy(),
            Pending::Capture(_) => true,
        }
    }

    /// Substitute against the current match. Captures that did not take
    /// part in the match resolve to `Value::Nil`.
    pub fn resolve(&self, captures: &Accessor) -> Value {
        match self {
            Pending::Literal(value) => value.clone(),
            Pending::Capture(name) => captures.value(name.as_str()),
        }
    }
}

impl From<Value> for Pending {
    fn from(value: Value) -> Self {
        Pending::Literal(value)
    }
}

impl From<&str> for Pending {
    fn from(text: &str) -> Self {
        Pending::Literal(Value::from(text))
    }
}

impl From<String> for Pending {
    fn from(text: String) -> Self {
        Pending::Literal(Value::from(text))
    }
}

impl From<bool> for Pending {
    fn from(b: bool) -> Self {
        Pending::Literal(Value::Bool(b))
    }
}

impl From<i64> for Pending {
    fn from(n: i64) -> Self {
        Pending::Literal(Value::Int(n))
    }
}

/// Ordered `key => pending value` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pairs(Vec<(Key, Pending)>);

impl Pairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. Plain `&str` keys become symbolic keys.
    pub fn pair(mut self, key: &str, value: impl Into<Pending>) -> Self {
        self.0.push((Key::sym(key), value.into()));
        self
    }

    pub fn pair_key(mut self, key: Key, value: impl Into<Pending>) -> Self {
        self.0.push((key, value.into()));
        self
    }

    /// Append the stop marker.
    pub fn stop(self) -> Self {
        self.pair(STOP_MARKER, true)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, Pending)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a rule's pattern is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// The raw line.
    Line,
    /// A record field, read when the rule is evaluated.
    Field(Key),
    /// Fixed text.
    Text(String),
}

impl Subject {
    pub fn field(name: &str) -> Self {
        Subject::Field(Key::sym(name))
    }

    fn resolve(&self, scope: &Scope<'_>) -> Option<String> {
        match self {
            Subject::Line => Some(scope.line().to_string()),
            Subject::Field(key) => scope.get(key).and_then(Value::as_str).map(str::to_string),
            Subject::Text(text) => Some(text.clone()),
        }
    }
}

pub type RuleBlock = dyn Fn(&mut Scope<'_>, &Accessor) -> Result<(), DelogError> + Send + Sync;

/// Who handles a successful match instead of the pending pairs.
#[derive(Clone)]
pub enum Delegate {
    Block(Arc<RuleBlock>),
    /// A named operation, called through the sandbox with the captures.
    Operation(String),
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Block(_) => f.write_str("Block(..)"),
            Delegate::Operation(name) => f.debug_tuple("Operation").field(name).finish(),
        }
    }
}

/// One entry of a mapping-style match argument.
#[derive(Debug, Clone)]
pub enum MappingEntry {
    Subject(Regex, Subject),
    Pair(Key, Pending),
}

/// First argument of `on`.
#[derive(Debug, Clone)]
pub enum MatchArg {
    Pattern(Regex),
    /// `{ pattern => subject, key => value, ... }`; the first entry must be
    /// the pattern/subject pair.
    Mapping(Vec<MappingEntry>),
}

/// Second argument of `on`.
#[derive(Debug, Clone, Default)]
pub enum DataArg {
    #[default]
    None,
    Pairs(Pairs),
    Operation(String),
}

impl From<Pairs> for DataArg {
    fn from(pairs: Pairs) -> Self {
        DataArg::Pairs(pairs)
    }
}

/// A normalized `on(...)` declaration.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    subject: Subject,
    pairs: Pairs,
    delegate: Option<Delegate>,
}

impl Rule {
    /// Normalize the call shapes of `on` into one rule:
    ///
    /// 1. pattern + pairs: match the line, merge the pairs
    /// 2. pattern + operation name (no block): delegate to that operation
    /// 3. mapping: first entry is `(pattern, subject)`, the rest are pairs
    /// 4. bare pattern: match the line, nothing pending
    ///
    /// A block always wins as the delegate.
    pub fn normalize(
        match_arg: MatchArg,
        data: DataArg,
        block: Option<Arc<RuleBlock>>,
    ) -> Result<Self, DelogError> {
        let mut delegate = block.map(Delegate::Block);

        let (pattern, subject, pairs) = match (match_arg, data) {
            (MatchArg::Pattern(pattern), DataArg::Pairs(pairs)) => (pattern, Subject::Line, pairs),
            (MatchArg::Mapping(_), DataArg::Pairs(_)) => {
                return Err(DelogError::configuration(
                    "a mapping match cannot also take a pair list",
                ));
            }
            (match_arg, DataArg::Operation(operation)) => {
                if delegate.is_none() {
                    delegate = Some(Delegate::Operation(operation));
                }
                Self::split_match(match_arg)?
            }
            (match_arg, DataArg::None) => Self::split_match(match_arg)?,
        };

        Ok(Self {
            pattern,
            subject,
            pairs,
            delegate,
        })
    }

    fn split_match(match_arg: MatchArg) -> Result<(Regex, Subject, Pairs), DelogError> {
        match match_arg {
            MatchArg::Pattern(pattern) => Ok((pattern, Subject::Line, Pairs::new())),
            MatchArg::Mapping(entries) => {
                let mut entries = entries.into_iter();
                let (pattern, subject) = match entries.next() {
                    Some(MappingEntry::Subject(pattern, subject)) => (pattern, subject),
                    _ => {
                        return Err(DelogError::configuration(
                            "the first mapping entry must pair a pattern with its subject",
                        ));
                    }
                };

                let mut pairs = Pairs::new();
                for entry in entries {
                    match entry {
                        MappingEntry::Pair(key, value) => pairs = pairs.pair_key(key, value),
                        MappingEntry::Subject(pattern, _) => {
                            return Err(DelogError::configuration(format!(
                                "pattern {} can only appear as the first mapping entry",
                                pattern
                            )));
                        }
                    }
                }
                Ok((pattern, subject, pairs))
            }
        }
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn pairs(&self) -> &Pairs {
        &self.pairs
    }

    pub fn delegate(&self) -> Option<&Delegate> {
        self.delegate.as_ref()
    }

    /// Evaluate against the scope's record. Returns whether the pattern
    /// matched; a stopped record never matches.
    pub(crate) fn apply(&self, scope: &mut Scope<'_>) -> Result<bool, DelogError> {
        if scope.stopped() {
            return Ok(false);
        }

        let Some(subject) = self.subject.resolve(scope) else {
            return Ok(false);
        };
        let Some(captures) = self.pattern.captures(&subject) else {
            return Ok(false);
        };
        let captures = Accessor::from_captures(&self.pattern, &captures);
        debug!(pattern = %self.pattern, "rule matched");

        match &self.delegate {
            Some(Delegate::Block(block)) => block(scope, &captures)?,
            Some(Delegate::Operation(operation)) => {
                scope.call(operation, &[Value::Map(captures)])?;
            }
            None => {
                for (key, value) in self.pairs.iter() {
                    if key.name() == STOP_MARKER && value.is_truthy() {
                        scope.stop();
                        continue;
                    }
                    scope.set(key.clone(), value.resolve(&captures));
                }
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Record;
    use crate::parser::Options;
    use crate::sandbox::{Context, Operations};
    use crate::value::sym;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    fn run(rule: &Rule, line: &str, context: &mut Context) -> Result<Record, DelogError> {
        let mut record = Record::new();
        context.run(&mut record, line, &Options::default(), |scope| scope.on(rule).map(|_| ()))?;
        Ok(record)
    }

    // ── normalization ───────────────────────────────────────────

    #[test]
    fn test_pattern_with_pairs() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\A\*")),
            Pairs::new().pair("type", sym("comment")).into(),
            None,
        )
        .unwrap();

        assert_eq!(rule.subject(), &Subject::Line);
        assert_eq!(rule.pairs().len(), 1);
        assert!(rule.delegate().is_none());
    }

    #[test]
    fn test_operation_name_becomes_delegate() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\AB")),
            DataArg::Operation("test_method".into()),
            None,
        )
        .unwrap();

        assert!(matches!(rule.delegate(), Some(Delegate::Operation(name)) if name == "test_method"));
    }

    #[test]
    fn test_block_wins_over_operation_name() {
        fn noop(_: &mut Scope<'_>, _: &Accessor) -> Result<(), DelogError> {
            Ok(())
        }
        let block: Arc<RuleBlock> = Arc::new(noop);
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\AB")),
            DataArg::Operation("test_method".into()),
            Some(block),
        )
        .unwrap();

        assert!(matches!(rule.delegate(), Some(Delegate::Block(_))));
    }

    #[test]
    fn test_mapping_splits_subject_and_pairs() {
        let rule = Rule::normalize(
            MatchArg::Mapping(vec![
                MappingEntry::Subject(re(r"\Aserver_cvar"), Subject::field("log")),
                MappingEntry::Pair(Key::sym("type"), sym("cvar_set").into()),
                MappingEntry::Pair(Key::sym("cvar"), d("cvar")),
            ]),
            DataArg::None,
            None,
        )
        .unwrap();

        assert_eq!(rule.subject(), &Subject::field("log"));
        assert_eq!(rule.pairs().len(), 2);
    }

    #[test]
    fn test_mapping_must_start_with_subject() {
        let err = Rule::normalize(
            MatchArg::Mapping(vec![MappingEntry::Pair(Key::sym("type"), "x".into())]),
            DataArg::None,
            None,
        )
        .unwrap_err();

        assert!(err.is_configuration());
    }

    // ── evaluation ──────────────────────────────────────────────

    #[test]
    fn test_pairs_after_stop_marker_are_dropped() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\ASTOP (?<md>.*?)\n\z")),
            Pairs::new()
                .pair("m", d("md"))
                .stop()
                .pair("after", true)
                .into(),
            None,
        )
        .unwrap();

        let record = run(&rule, "STOP foo bar\n", &mut Context::new()).unwrap();

        assert!(record.is_stopped());
        assert_eq!(record.get("m"), Some(&Value::from("foo bar")));
        assert!(!record.has_key("after"));
    }

    #[test]
    fn test_falsy_stop_marker_does_not_stop() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re("x")),
            Pairs::new().pair(STOP_MARKER, false).pair("after", true).into(),
            None,
        )
        .unwrap();

        let record = run(&rule, "x", &mut Context::new()).unwrap();

        assert!(!record.is_stopped());
        assert_eq!(record.get("after"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_missing_capture_resolves_nil() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\A(?<a>a)?b")),
            Pairs::new().pair("a", d("a")).pair("ghost", d("not_a_group")).into(),
            None,
        )
        .unwrap();

        let record = run(&rule, "b", &mut Context::new()).unwrap();

        assert_eq!(record.get("a"), Some(&Value::Nil));
        assert_eq!(record.get("ghost"), Some(&Value::Nil));
    }

    #[test]
    fn test_no_match_leaves_record_untouched() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\A\*")),
            Pairs::new().pair("type", sym("comment")).into(),
            None,
        )
        .unwrap();

        let record = run(&rule, "L not a comment", &mut Context::new()).unwrap();
        assert!(record.data().is_empty());
    }

    #[test]
    fn test_field_subject_reads_record() {
        let rule = Rule::normalize(
            MatchArg::Mapping(vec![
                MappingEntry::Subject(re(r"\A\s*\*(?<comment_data>.*)\z"), Subject::field("log")),
                MappingEntry::Pair(Key::sym("cdata"), d("comment_data")),
            ]),
            DataArg::None,
            None,
        )
        .unwrap();

        let mut context = Context::new();
        let mut record = Record::new();
        record.set(Key::sym("log"), " * hello");
        context
            .run(&mut record, "unrelated", &Options::default(), |scope| scope.on(&rule).map(|_| ()))
            .unwrap();

        assert_eq!(record.get("cdata"), Some(&Value::from(" hello")));
    }

    #[test]
    fn test_missing_field_subject_never_matches() {
        let rule = Rule::normalize(
            MatchArg::Mapping(vec![MappingEntry::Subject(re(".*"), Subject::field("log"))]),
            DataArg::Operation("never".into()),
            None,
        )
        .unwrap();

        assert!(run(&rule, "anything", &mut Context::new()).is_ok());
    }

    #[test]
    fn test_operation_delegate_receives_captures() {
        let ops = Operations::new("test_parser")
            .with("test_method", |scope, args| {
                let foo = args
                    .first()
                    .and_then(Value::as_map)
                    .and_then(|m| m.get_str("foo"))
                    .map(str::to_string);
                scope.set("hello", sym("world"));
                scope.set("foo", foo);
                Ok(Value::Nil)
            })
            .into_receiver();
        let mut context = Context::new();
        context.add_method("test_method", ops);

        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\AB (?<foo>.*?)\n")),
            DataArg::Operation("test_method".into()),
            None,
        )
        .unwrap();

        let record = run(&rule, "B bar\n", &mut context).unwrap();
        assert_eq!(record.get("hello"), Some(&sym("world")));
        assert_eq!(record.get("foo"), Some(&Value::from("bar")));
    }

    #[test]
    fn test_operation_delegate_must_be_whitelisted() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re(r"\AB")),
            DataArg::Operation("test_method".into()),
            None,
        )
        .unwrap();

        let err = run(&rule, "B bar\n", &mut Context::new()).unwrap_err();
        assert!(err.is_capability());
    }

    #[test]
    fn test_stopped_record_skips_rule() {
        let rule = Rule::normalize(
            MatchArg::Pattern(re("x")),
            Pairs::new().pair("hit", true).into(),
            None,
        )
        .unwrap();

        let mut context = Context::new();
        let mut record = Record::new();
        let matched = context
            .run(&mut record, "x", &Options::default(), |scope| {
                scope.stop();
                scope.on(&rule)
            })
            .unwrap();

        assert!(!matched);
        assert!(!record.has_key("hit"));
    }
}
