//! Run: parse every line of a log and print one record per line.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::conf::{DelogConfig, OutputFormat};
use crate::engine::Data;
use crate::error::DelogError;
use crate::logfile::Log;

#[derive(Serialize)]
struct Entry<'a> {
    number: usize,
    data: &'a Data,
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub parsed: usize,
    pub failed: usize,
}

/// Parse `path` and write each record to `out`. Lines that fail to parse
/// are logged and skipped.
pub fn run(path: &Path, config: &DelogConfig, mut out: impl Write) -> Result<Summary, DelogError> {
    let log = Log::open(path, config.to_options())?;
    // Resolve once up front so a bad selector fails the run, not every line.
    config.to_options().resolve_parser()?;

    let mut summary = Summary::default();
    for line in &log {
        let data = match line.data() {
            Ok(data) => data,
            Err(e) => {
                warn!(line = line.number(), error = %e, "failed to parse line");
                summary.failed += 1;
                continue;
            }
        };

        let entry = Entry {
            number: line.number(),
            data,
        };
        let rendered = match config.output {
            OutputFormat::Json => serde_json::to_string(&entry),
            OutputFormat::Pretty => serde_json::to_string_pretty(&entry),
        }
        .map_err(|e| DelogError::operation("render", e.to_string()))?;
        writeln!(out, "{}", rendered)?;
        summary.parsed += 1;
    }

    info!(
        "Parsed {} of {} lines from {}",
        summary.parsed,
        log.len(),
        path.display()
    );
    Ok(summary)
}
