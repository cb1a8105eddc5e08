//! Destinations for the per-step time series.
//!
//! The simulator never interprets where records go; it only appends one
//! group of events per step and hands over a summary when the run ends.

use crate::core::error::ContagionError;
use crate::simulation::simulator::CascadeSummary;
use crate::simulation::time_series::CascadeEvent;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receiver of simulation output.
pub trait RecordSink {
    /// Accept the events recorded at step `t`.
    fn append(&mut self, t: usize, events: &[CascadeEvent]) -> Result<(), ContagionError>;

    /// Called once by [`Simulator::run`](crate::simulation::simulator::Simulator::run)
    /// after the run reaches a terminal state.
    fn finish(&mut self, _summary: &CascadeSummary) -> Result<(), ContagionError> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn append(&mut self, t: usize, events: &[CascadeEvent]) -> Result<(), ContagionError> {
        (**self).append(t, events)
    }

    fn finish(&mut self, summary: &CascadeSummary) -> Result<(), ContagionError> {
        (**self).finish(summary)
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn append(&mut self, t: usize, events: &[CascadeEvent]) -> Result<(), ContagionError> {
        (**self).append(t, events)
    }

    fn finish(&mut self, summary: &CascadeSummary) -> Result<(), ContagionError> {
        (**self).finish(summary)
    }
}

/// Keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<(usize, Vec<CascadeEvent>)>,
    summary: Option<CascadeSummary>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[(usize, Vec<CascadeEvent>)] {
        &self.records
    }

    pub fn summary(&self) -> Option<&CascadeSummary> {
        self.summary.as_ref()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, t: usize, events: &[CascadeEvent]) -> Result<(), ContagionError> {
        self.records.push((t, events.to_vec()));
        Ok(())
    }

    fn finish(&mut self, summary: &CascadeSummary) -> Result<(), ContagionError> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct StepLine<'a> {
    t: usize,
    events: &'a [CascadeEvent],
}

/// Writes one JSON object per step: `{"t": 0, "events": [...]}`.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn append(&mut self, t: usize, events: &[CascadeEvent]) -> Result<(), ContagionError> {
        serde_json::to_writer(&mut self.writer, &StepLine { t, events })?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self, _summary: &CascadeSummary) -> Result<(), ContagionError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Saves a run into a directory: `time_series.jsonl` and `summary.json`.
///
/// Each step is flushed to `time_series.jsonl` as soon as it is appended,
/// so a run driven by hand with `step()` leaves a readable log even if
/// `run()` never finishes it. `summary.json` is only written by `run()`.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    steps: JsonLinesSink<BufWriter<File>>,
}

impl DirectorySink {
    pub const TIME_SERIES_FILE: &'static str = "time_series.jsonl";
    pub const SUMMARY_FILE: &'static str = "summary.json";

    /// Create `dir` if needed and open the time-series file, truncating
    /// any previous run.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, ContagionError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let file = File::create(dir.join(Self::TIME_SERIES_FILE))?;
        Ok(Self {
            dir,
            steps: JsonLinesSink::new(BufWriter::new(file)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSink for DirectorySink {
    fn append(&mut self, t: usize, events: &[CascadeEvent]) -> Result<(), ContagionError> {
        self.steps.append(t, events)?;
        self.steps.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self, summary: &CascadeSummary) -> Result<(), ContagionError> {
        self.steps.finish(summary)?;
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(self.dir.join(Self::SUMMARY_FILE), json)?;
        log::info!("saved run {} to {}", summary.run_id, self.dir.display());
        Ok(())
    }
}
