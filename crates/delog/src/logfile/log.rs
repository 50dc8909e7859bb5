use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::DelogError;
use crate::logfile::Line;
use crate::parser::Options;

/// A log loaded into memory as ordered [`Line`]s.
///
/// Loading only splits the text; each line is parsed on first access.
#[derive(Debug, Clone)]
pub struct Log {
    path: Option<PathBuf>,
    options: Arc<Options>,
    lines: Vec<Line>,
}

impl Log {
    /// Load the file at `path`.
    pub fn open(path: impl AsRef<Path>, options: Options) -> Result<Self, DelogError> {
        let path = path.as_ref().to_path_buf();
        let options = Arc::new(options);
        let lines = load_path(&path, &options)?;
        Ok(Self {
            path: Some(path),
            options,
            lines,
        })
    }

    pub fn from_reader(reader: impl BufRead, options: Options) -> Result<Self, DelogError> {
        let options = Arc::new(options);
        let lines = load(reader, &options)?;
        Ok(Self {
            path: None,
            options,
            lines,
        })
    }

    pub fn from_text(text: &str, options: Options) -> Self {
        let options = Arc::new(options);
        let lines = text
            .split_inclusive('\n')
            .enumerate()
            .map(|(number, text)| Line::new(text, number, Arc::clone(&options)))
            .collect();
        Self {
            path: None,
            options,
            lines,
        }
    }

    /// Re-read the source file. Logs not loaded from a path are unchanged.
    pub fn refresh(&mut self) -> Result<(), DelogError> {
        if let Some(path) = &self.path {
            self.lines = load_path(path, &self.options)?;
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Line> {
        self.lines.iter()
    }

    pub fn get(&self, number: usize) -> Option<&Line> {
        self.lines.get(number)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl<'a> IntoIterator for &'a Log {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

fn load_path(path: &Path, options: &Arc<Options>) -> Result<Vec<Line>, DelogError> {
    let file = File::open(path)
        .map_err(|e| DelogError::Source(format!("cannot open {}: {}", path.display(), e)))?;
    let lines = load(BufReader::new(file), options)?;
    debug!(path = %path.display(), lines = lines.len(), "log loaded");
    Ok(lines)
}

fn load(mut reader: impl BufRead, options: &Arc<Options>) -> Result<Vec<Line>, DelogError> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DelogError::Source(format!("cannot read line {}: {}", lines.len(), e)))?;
        if read == 0 {
            break;
        }
        // A bad byte only affects its own line.
        let text = String::from_utf8_lossy(&buf);
        if matches!(text, Cow::Owned(_)) {
            warn!(line = lines.len(), "invalid UTF-8 replaced");
        }
        lines.push(Line::new(text.into_owned(), lines.len(), Arc::clone(options)));
    }
    Ok(lines)
}
