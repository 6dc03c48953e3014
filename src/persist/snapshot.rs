//! The canonical point-in-time snapshot document and its atomic writer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::write_json_atomic;
use crate::error::Result;
use crate::state::RunState;

/// The complete document written to `latest.json`: every run-state field
/// plus the elapsed time derived at write time. Consumers must treat every
/// field as optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub state: RunState,
    pub elapsed_seconds: f64,
}

/// Writes snapshots atomically so readers never observe a partial
/// document.
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the canonical snapshot. Callers treat errors as best-effort:
    /// the next flush retries naturally.
    pub fn write(&self, snapshot: &Snapshot) -> Result<()> {
        write_json_atomic(&self.path, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn snapshot_flattens_state_fields_to_top_level() {
        let snapshot = Snapshot {
            state: RunState::new(0, 1),
            elapsed_seconds: 12.5,
        };
        let doc = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(doc["phase"], "init");
        assert_eq!(doc["step"], 0);
        assert_eq!(doc["elapsed_seconds"], 12.5);
        assert!(doc.get("state").is_none());
    }

    #[test]
    fn written_snapshot_parses_back() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("latest.json"));

        let snapshot = Snapshot {
            state: RunState::new(0, 1),
            elapsed_seconds: 1.0,
        };
        writer.write(&snapshot).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let parsed: Snapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.state.run_id, snapshot.state.run_id);
    }
}
