//! Selected-event listing (`run lumi event` per line).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use haa_core::{EventId, EventLog, Result};

pub const HEADER: &str = "run lumi event";

pub struct EventListWriter<W: Write> {
    out: W,
    written: u64,
}

impl EventListWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> EventListWriter<W> {
    /// Wrap `out` and write the header line.
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "{HEADER}")?;
        Ok(Self { out, written: 0 })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> EventLog for EventListWriter<W> {
    fn record(&mut self, id: EventId) -> Result<()> {
        writeln!(self.out, "{id}")?;
        self.written += 1;
        Ok(())
    }
}
