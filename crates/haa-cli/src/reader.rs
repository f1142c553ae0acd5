//! JSON-Lines event reader.

use std::fs;
use std::path::Path;

use haa_core::{Error, Event, EventSource, Result};

/// Events stored one JSON object per line. Blank lines are skipped.
///
/// The file is read once; entries are decoded on access.
pub struct JsonLinesSource {
    /// `(1-based line number, line)` for every non-blank line.
    lines: Vec<(usize, String)>,
}

impl JsonLinesSource {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let source = Self::from_text(&text);
        tracing::info!(path = %path.display(), entries = source.lines.len(), "opened event file");
        Ok(source)
    }

    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| (i + 1, l.to_string()))
            .collect();
        Self { lines }
    }
}

impl EventSource for JsonLinesSource {
    fn total_entries(&self) -> usize {
        self.lines.len()
    }

    fn get_entry(&mut self, index: usize) -> Result<Event> {
        let (line_no, line) = self.lines.get(index).ok_or_else(|| {
            Error::Validation(format!("entry {index} out of range ({} entries)", self.lines.len()))
        })?;
        serde_json::from_str(line).map_err(|e| Error::Format(format!("line {line_no}: {e}")))
    }
}
