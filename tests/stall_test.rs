//! Integration tests for stall detection: derived at flush time only,
//! phase-gated, cleared by progress or heartbeats.

mod common;

use std::thread;
use std::time::Duration;

use common::reporter_with;
use tempfile::TempDir;
use traincard::Reporter;

fn stall_prone(dir: &TempDir) -> Reporter {
    reporter_with(dir, |config| config.stall_timeout = Duration::ZERO)
}

#[test]
fn stall_flagged_after_timeout_in_train_phase() {
    let dir = TempDir::new().unwrap();
    let reporter = stall_prone(&dir);
    reporter.metric_at("loss", 1.0, 0);
    reporter.phase("train");
    thread::sleep(Duration::from_millis(20));

    // Not inferred eagerly: nothing set the flag yet.
    assert!(!reporter.state().stalled);

    reporter.flush_now();
    assert!(reporter.state().stalled);
    reporter.finish();
}

#[test]
fn no_stall_in_init_phase() {
    let dir = TempDir::new().unwrap();
    let reporter = stall_prone(&dir);
    thread::sleep(Duration::from_millis(20));
    reporter.flush_now();
    assert!(!reporter.state().stalled);
    reporter.finish();
}

#[test]
fn no_stall_in_done_phase() {
    let dir = TempDir::new().unwrap();
    let reporter = stall_prone(&dir);
    reporter.phase("done");
    thread::sleep(Duration::from_millis(20));
    reporter.flush_now();
    assert!(!reporter.state().stalled);
    reporter.finish();
}

#[test]
fn heartbeat_clears_stall_until_next_flush() {
    let dir = TempDir::new().unwrap();
    let reporter = stall_prone(&dir);
    reporter.metric_at("loss", 1.0, 0);
    reporter.phase("train");
    thread::sleep(Duration::from_millis(20));
    reporter.flush_now();
    assert!(reporter.state().stalled);

    reporter.heartbeat();
    assert!(!reporter.state().stalled);
    reporter.finish();
}

#[test]
fn metric_clears_stall() {
    let dir = TempDir::new().unwrap();
    let reporter = stall_prone(&dir);
    reporter.metric_at("loss", 1.0, 0);
    reporter.phase("train");
    thread::sleep(Duration::from_millis(20));
    reporter.flush_now();
    assert!(reporter.state().stalled);

    reporter.metric_at("loss", 0.9, 1);
    assert!(!reporter.state().stalled);
    reporter.finish();
}

#[test]
fn stalled_flag_lands_in_snapshot() {
    let dir = TempDir::new().unwrap();
    let reporter = stall_prone(&dir);
    reporter.phase("train");
    thread::sleep(Duration::from_millis(20));
    reporter.flush_now();

    let snapshot = common::read_snapshot(&reporter);
    assert_eq!(snapshot["stalled"], true);
    reporter.finish();
}
