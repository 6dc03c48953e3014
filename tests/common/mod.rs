//! Shared helpers for reporter integration tests.
#![allow(dead_code)]

use std::time::Duration;

use tempfile::TempDir;
use traincard::{Reporter, ReporterConfig};

/// A reporter wired for tests: output under a fresh temp dir, a flush
/// interval long enough that only explicit flushes run, and no signal
/// handler.
pub fn test_reporter(dir: &TempDir) -> Reporter {
    reporter_with(dir, |_| {})
}

pub fn reporter_with(dir: &TempDir, tweak: impl FnOnce(&mut ReporterConfig)) -> Reporter {
    let mut config = base_config(dir);
    tweak(&mut config);
    Reporter::new(config).expect("reporter construction")
}

pub fn base_config(dir: &TempDir) -> ReporterConfig {
    ReporterConfig {
        output_dir: Some(dir.path().join("tc")),
        flush_interval: Duration::from_secs(3600),
        install_signal_handler: false,
        ..ReporterConfig::default()
    }
}

/// Parse the canonical snapshot from the reporter's output directory.
pub fn read_snapshot(reporter: &Reporter) -> serde_json::Value {
    let raw = std::fs::read_to_string(reporter.output_dir().join("latest.json"))
        .expect("latest.json present");
    serde_json::from_str(&raw).expect("latest.json parses")
}
