//! Boundary traits
//!
//! The selection core talks to its collaborators only through these:
//! an event reader, a histogram sink and a selected-event listing. Concrete
//! adapters live in `haa-hist` and `haa-cli`.

use crate::Result;
use crate::objects::{Event, EventId};

/// Random-access source of materialized events.
pub trait EventSource {
    /// Number of entries available.
    fn total_entries(&self) -> usize;

    /// Materialize entry `index` (`0 <= index < total_entries()`).
    fn get_entry(&mut self, index: usize) -> Result<Event>;
}

/// Write-only histogram sink.
pub trait HistogramSink {
    /// Add `weight` at `value` to histogram `name` in category `tag`.
    fn fill(&mut self, name: &str, tag: &str, value: f64, weight: f64);
}

/// Side channel receiving the identifiers of selected events.
pub trait EventLog {
    /// Record one selected event.
    fn record(&mut self, id: EventId) -> Result<()>;
}

impl EventLog for Vec<EventId> {
    fn record(&mut self, id: EventId) -> Result<()> {
        self.push(id);
        Ok(())
    }
}
