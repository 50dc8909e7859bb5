use tracing::trace;

use crate::addin::date_time::{parse_time, DEFAULT_DATE_FORMAT, TIME_FORMAT_KEY};
use crate::engine::{d, Pairs, Subject};
use crate::error::DelogError;
use crate::parser::ParserType;
use crate::value::{sym, Key};

pub const NAME: &str = "basic";

/// `L mm/dd/YYYY - HH:MM:SS: <log>`
const LOG_LINE: &str = r"(?x)
    \AL\s
    (?<datetime>
        [0-9]{2}/[0-9]{2}/[0-9]{4}\s-\s   # date
        [0-9]{2}:[0-9]{2}:[0-9]{2}        # time
    ):\s
    (?<data>.+)
    \n?\z";

const LOGGED_COMMENT: &str = r"\A\s*\*(?<comment_data>.*)\z";
const SERVER_CVAR: &str = r#"\Aserver_cvar: "(?<cvar>.*)" "(?<value>.*)"\z"#;

/// Source-engine style server logs.
///
/// - `* ...` lines are comments: `type = comment`, then stop
/// - `L <date>: <log>` lines yield `time` (UTC) and `log`
/// - a `log` starting with `*` is a logged comment (`cdata`)
/// - `server_cvar: "name" "value"` yields `type = cvar_set`, `cvar`, `value`
pub fn definition() -> Result<ParserType, DelogError> {
    ParserType::builder(NAME).build(|rules| {
        rules.on(r"\A\*", Pairs::new().pair("type", sym("comment")).stop())?;

        rules.set(TIME_FORMAT_KEY, DEFAULT_DATE_FORMAT);

        rules.on_block(LOG_LINE, |scope, m| {
            let format = scope
                .get_str(TIME_FORMAT_KEY)
                .unwrap_or(DEFAULT_DATE_FORMAT)
                .to_string();
            let datetime = m.get_str("datetime").unwrap_or_default();
            let time = parse_time(datetime, &format)?;
            trace!(%time, "log line timestamp");

            scope.set(Key::sym("time"), time);
            scope.set(Key::sym("log"), m.value("data"));
            Ok(())
        })?;

        rules.on_subject(
            LOGGED_COMMENT,
            Subject::field("log"),
            Pairs::new()
                .pair("type", sym("comment"))
                .pair("cdata", d("comment_data"))
                .stop(),
        )?;

        rules.on_subject(
            SERVER_CVAR,
            Subject::field("log"),
            Pairs::new()
                .pair("type", sym("cvar_set"))
                .pair("cvar", d("cvar"))
                .pair("value", d("value"))
                .stop(),
        )?;

        Ok(())
    })
}
