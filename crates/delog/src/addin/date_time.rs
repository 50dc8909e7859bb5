use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::accessor::Accessor;
use crate::addin::AddinUnit;
use crate::engine::{DataArg, MatchArg, Rule, RuleBlock};
use crate::error::DelogError;
use crate::sandbox::Scope;
use crate::value::{Key, Value};

pub const DATE_MATCH_KEY: &str = "date_match_to";
pub const DATE_FORMAT_KEY: &str = "date_format";
pub const TIME_FORMAT_KEY: &str = "time_format";
pub const TIME_KEY: &str = "time";

pub const DEFAULT_DATE_MATCH: &str =
    r"[0-9]{2}/[0-9]{2}/[0-9]{4}\s-\s[0-9]{2}:[0-9]{2}:[0-9]{2}";
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y - %H:%M:%S";

const PARSE_TIME: &str = "parse_time";

/// Parse `text` with a strftime `format` into a UTC timestamp. Formats
/// without an offset are read as UTC.
pub fn parse_time(text: &str, format: &str) -> Result<DateTime<Utc>, DelogError> {
    if format.contains("%z") || format.contains("%:z") {
        let time = DateTime::parse_from_str(text.trim(), format)?;
        return Ok(time.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(text.trim(), format)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Finds a timestamp anywhere in the line and stores it under `time`.
///
/// Setup defaults `date_match_to` and `date_format` unless the record
/// already has them. The format used is `time_format` when present,
/// else `date_format`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeAddin;

impl DateTimeAddin {
    fn format(scope: &Scope<'_>) -> String {
        scope
            .get_str(TIME_FORMAT_KEY)
            .or_else(|| scope.get_str(DATE_FORMAT_KEY))
            .unwrap_or(DEFAULT_DATE_FORMAT)
            .to_string()
    }
}

fn store_time(scope: &mut Scope<'_>, captures: &Accessor) -> Result<(), DelogError> {
    let Some(text) = captures.get_str(TIME_KEY) else {
        return Ok(());
    };
    let time = parse_time(text, &DateTimeAddin::format(scope))?;
    scope.set(Key::sym(TIME_KEY), time);
    Ok(())
}

impl AddinUnit for DateTimeAddin {
    fn name(&self) -> &str {
        "DateTime"
    }

    fn whitelist(&self) -> &[&'static str] {
        &[PARSE_TIME]
    }

    fn responds_to(&self, operation: &str) -> bool {
        operation == PARSE_TIME
    }

    fn invoke(
        &self,
        operation: &str,
        scope: &mut Scope<'_>,
        args: &[Value],
    ) -> Result<Value, DelogError> {
        if operation != PARSE_TIME {
            return Err(DelogError::Capability {
                operation: operation.to_string(),
            });
        }

        let (text, format) = match args {
            [text] => (text, Self::format(scope)),
            [text, format] => (
                text,
                format
                    .as_str()
                    .ok_or_else(|| DelogError::operation(PARSE_TIME, "format must be a string"))?
                    .to_string(),
            ),
            _ => {
                return Err(DelogError::Arity {
                    name: PARSE_TIME.to_string(),
                    given: args.len(),
                })
            }
        };
        let text = text
            .as_str()
            .ok_or_else(|| DelogError::operation(PARSE_TIME, "expected a string to parse"))?;

        Ok(Value::Time(parse_time(text, &format)?))
    }

    fn setup(&self, scope: &mut Scope<'_>) -> Result<(), DelogError> {
        if !scope.has_key(DATE_MATCH_KEY) {
            scope.set(Key::sym(DATE_MATCH_KEY), DEFAULT_DATE_MATCH);
        }
        if !scope.has_key(DATE_FORMAT_KEY) {
            scope.set(Key::sym(DATE_FORMAT_KEY), DEFAULT_DATE_FORMAT);
        }

        let date_match = scope.get_str(DATE_MATCH_KEY).unwrap_or(DEFAULT_DATE_MATCH);
        let pattern = Regex::new(&format!("(?<time>{})", date_match))?;
        let block: Arc<RuleBlock> = Arc::new(store_time);
        let rule = Rule::normalize(MatchArg::Pattern(pattern), DataArg::None, Some(block))?;
        scope.on(&rule)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addin::{Addin, AddinRegistry};
    use crate::engine::Record;
    use crate::parser::Options;
    use crate::sandbox::Context;

    fn sandbox() -> (Addin, Context) {
        let unit: Arc<dyn AddinUnit> = Arc::new(DateTimeAddin);
        let addin = Addin::resolve(unit.into(), &AddinRegistry::new()).unwrap();
        let mut context = Context::new();
        for operation in addin.operations() {
            context.add_method(*operation, addin.receiver());
        }
        (addin, context)
    }

    fn activate(record: &mut Record, line: &str) -> Result<(), DelogError> {
        let (addin, mut context) = sandbox();
        context.run(record, line, &Options::default(), |scope| addin.setup(scope))
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Value {
        Value::Time(Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())
    }

    // ── parse_time ──────────────────────────────────────────────────

    #[test]
    fn test_parse_time_default_format() {
        let time = parse_time("02/09/2013 - 01:19:03", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(Value::Time(time), utc(2013, 2, 9, 1, 19, 3));
    }

    #[test]
    fn test_parse_time_with_offset() {
        let time = parse_time("2013-02-09 03:19:03 +0200", "%Y-%m-%d %H:%M:%S %z").unwrap();
        assert_eq!(Value::Time(time), utc(2013, 2, 9, 1, 19, 3));
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        let err = parse_time("not a date", DEFAULT_DATE_FORMAT).unwrap_err();
        assert!(matches!(err, DelogError::Time(_)));
    }

    // ── Setup ───────────────────────────────────────────────────────

    #[test]
    fn test_setup_defaults_and_extracts_time() {
        let mut record = Record::new();
        activate(&mut record, "L 02/09/2013 - 01:19:03: log data\n").unwrap();

        assert_eq!(record.get(DATE_FORMAT_KEY), Some(&Value::from(DEFAULT_DATE_FORMAT)));
        assert_eq!(record.get(DATE_MATCH_KEY), Some(&Value::from(DEFAULT_DATE_MATCH)));
        assert_eq!(record.get(TIME_KEY), Some(&utc(2013, 2, 9, 1, 19, 3)));
    }

    #[test]
    fn test_setup_keeps_preset_keys() {
        let presets = vec![
            (Key::sym(DATE_MATCH_KEY), Value::from(r"[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9:]{8}")),
            (Key::sym(DATE_FORMAT_KEY), Value::from("%Y-%m-%d %H:%M:%S")),
        ];
        let mut record = Record::with_presets(&presets);
        activate(&mut record, "at 2013-02-09 01:19:03 something\n").unwrap();

        assert_eq!(record.get(DATE_FORMAT_KEY), Some(&Value::from("%Y-%m-%d %H:%M:%S")));
        assert_eq!(record.get(TIME_KEY), Some(&utc(2013, 2, 9, 1, 19, 3)));
    }

    #[test]
    fn test_setup_without_date_leaves_time_unset() {
        let mut record = Record::new();
        activate(&mut record, "no date here\n").unwrap();
        assert!(!record.has_key(TIME_KEY));
    }

    #[test]
    fn test_time_format_takes_precedence() {
        let presets = vec![(Key::sym(TIME_FORMAT_KEY), Value::from("%d/%m/%Y - %H:%M:%S"))];
        let mut record = Record::with_presets(&presets);
        activate(&mut record, "02/09/2013 - 01:19:03\n").unwrap();
        assert_eq!(record.get(TIME_KEY), Some(&utc(2013, 9, 2, 1, 19, 3)));
    }

    // ── Whitelisted operation ───────────────────────────────────────

    #[test]
    fn test_parse_time_operation() {
        let (_, mut context) = sandbox();
        let mut record = Record::new();

        let value = context
            .run(&mut record, "", &Options::default(), |scope| {
                scope.call(PARSE_TIME, &[Value::from("02/09/2013 - 01:19:03")])
            })
            .unwrap();
        assert_eq!(value, utc(2013, 2, 9, 1, 19, 3));

        let err = context
            .run(&mut record, "", &Options::default(), |scope| scope.call(PARSE_TIME, &[]))
            .unwrap_err();
        assert!(matches!(err, DelogError::Arity { given: 0, .. }));
    }
}
