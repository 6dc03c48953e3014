//! Durable artifacts: the atomic snapshot, resume continuity, and the
//! checkpoint index.

mod checkpoint_index;
mod resume;
mod snapshot;

pub use checkpoint_index::CheckpointIndex;
pub use snapshot::{Snapshot, SnapshotWriter};

pub(crate) use resume::apply_prior_run;

use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Canonical snapshot file name.
pub const SNAPSHOT_FILE: &str = "latest.json";

/// Append-only event log file name.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Checkpoint index file name.
pub const CHECKPOINTS_FILE: &str = "checkpoints.json";

/// Serialize `value` to a temp file in the target's directory, then rename
/// it over `path`. A reader always sees either the previous complete
/// document or the new one, never a partial write; the temp file is
/// removed automatically if anything fails before the rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file(), value)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        write_json_atomic(&path, &serde_json::json!({"v": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"v": 2})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(doc["v"], 2);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("doc.json")]);
    }
}
