//! Best-effort JSONL event writer.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::types::EventRecord;
use crate::error::Result;

/// Append-only writer of one JSON line per ingested event.
///
/// The file is opened once in append mode and guarded by its own lock so
/// concurrent appends never interleave. Write failures are recorded at
/// debug level and otherwise discarded: the event log must never surface
/// errors into the training loop.
pub struct EventLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl EventLog {
    /// Open (or create) the log at `path` for appending.
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    /// A log that never writes. Used on non-primary ranks, which are not
    /// permitted to persist anything.
    pub fn disabled(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, best-effort.
    pub fn append(&self, record: &EventRecord) {
        let mut line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                debug!("event serialization failed: {e}");
                return;
            }
        };
        line.push('\n');

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(line.as_bytes()) {
                debug!("event append failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{MetricTags, ReporterEvent};
    use tempfile::TempDir;

    fn metric_event(step: u64) -> EventRecord {
        EventRecord::new(ReporterEvent::Metric {
            name: "loss".to_string(),
            value: 1.0,
            step,
            tags: MetricTags::new(),
        })
    }

    #[test]
    fn appends_one_line_per_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = EventLog::open(path.clone()).unwrap();

        log.append(&metric_event(0));
        log.append(&metric_event(1));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let record: EventRecord = serde_json::from_str(line).unwrap();
            assert!(matches!(record.event, ReporterEvent::Metric { .. }));
        }
    }

    #[test]
    fn appends_accumulate_across_openings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");

        EventLog::open(path.clone()).unwrap().append(&metric_event(0));
        EventLog::open(path.clone()).unwrap().append(&metric_event(1));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn disabled_log_never_creates_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        let log = EventLog::disabled(path.clone());
        log.append(&metric_event(0));
        assert!(!path.exists());
    }
}
