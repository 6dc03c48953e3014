//! Secondary checkpoint-only snapshot, refreshed on every checkpoint so
//! consumers can poll it without parsing the full snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use super::write_json_atomic;
use crate::error::Result;
use crate::state::CheckpointRecord;

pub struct CheckpointIndex {
    path: PathBuf,
}

impl CheckpointIndex {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rewrite the index with the full checkpoint list.
    pub fn write(&self, checkpoints: &[CheckpointRecord]) -> Result<()> {
        write_json_atomic(&self.path, &checkpoints)
    }

    /// Read an index back. Intended for consumers and tests.
    pub fn load(path: &Path) -> Result<Vec<CheckpointRecord>> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
