//! Mutation API over [`RunState`], linearized by a single lock.
//!
//! Every operation holds the lock only for in-memory work; serialization
//! and file writes always happen after release.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;

use super::run_state::{
    CheckpointRecord, FailureRecord, LogEntry, LogLevel, MetricPoint, Phase, RunState,
    TelemetryMap, MAX_LOG_LINES, MAX_METRIC_POINTS,
};
use crate::persist::Snapshot;

/// Thread-safe owner of the run state. Safe to call from any number of
/// threads concurrently; mutations are linearized by the lock.
pub struct StateStore {
    state: Mutex<RunState>,
    primary: bool,
}

impl StateStore {
    pub fn new(state: RunState, primary: bool) -> Self {
        Self {
            state: Mutex::new(state),
            primary,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // A poisoned lock means a panic elsewhere in this crate mid-mutation;
        // the state itself is still structurally valid, so keep serving it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a scalar metric. Returns the step actually used, or `None`
    /// when the call was a non-primary no-op.
    pub fn record_metric(&self, name: &str, value: f64, step: Option<u64>) -> Option<u64> {
        if !self.primary {
            return None;
        }
        let mut state = self.lock();
        let step = step.unwrap_or(state.step);
        state.step = state.step.max(step);
        state.last_update_time = Utc::now();
        state.stalled = false;

        let series = state.metrics.entry(name.to_string()).or_default();
        // Skip only when the last stored point carries this exact step;
        // duplicates deeper in the series are deliberately not scanned for.
        if series.last().map(|point| point.step) != Some(step) {
            series.push(MetricPoint::new(step, value));
            if series.len() > MAX_METRIC_POINTS {
                let excess = series.len() - MAX_METRIC_POINTS;
                series.drain(..excess);
            }
        }
        Some(step)
    }

    /// Append a log line to the bounded ring buffer. Non-primary no-op.
    pub fn append_log(&self, line: &str, level: LogLevel) {
        if !self.primary {
            return;
        }
        let mut state = self.lock();
        state.logs.push_back(LogEntry {
            time: Utc::now(),
            line: line.to_string(),
            level,
        });
        while state.logs.len() > MAX_LOG_LINES {
            state.logs.pop_front();
        }
    }

    pub fn set_phase(&self, phase: Phase) {
        self.lock().phase = phase;
    }

    /// Append a checkpoint record stamped with the current step and time.
    /// Returns a copy for the event log and checkpoint index.
    pub fn record_checkpoint(&self, path: &str, metadata: TelemetryMap) -> CheckpointRecord {
        let mut state = self.lock();
        let record = CheckpointRecord {
            path: path.to_string(),
            step: state.step,
            time: Utc::now(),
            metadata,
        };
        state.checkpoints.push(record.clone());
        record
    }

    /// Replace the telemetry snapshot wholesale.
    pub fn set_system(&self, stats: TelemetryMap) {
        let mut state = self.lock();
        state.system = stats;
        state.last_update_time = Utc::now();
    }

    pub fn touch_heartbeat(&self) {
        let mut state = self.lock();
        state.last_heartbeat = Utc::now();
        state.stalled = false;
    }

    /// Record a failure stamped with the current step and time. Returns a
    /// copy for the event log.
    pub fn record_failure(
        &self,
        kind: &str,
        message: &str,
        traceback: Option<String>,
    ) -> FailureRecord {
        let mut state = self.lock();
        let record = FailureRecord {
            kind: kind.to_string(),
            message: message.to_string(),
            traceback,
            step: state.step,
            time: Utc::now(),
            oom_suspected: message.to_lowercase().contains("out of memory"),
        };
        state.failure = Some(record.clone());
        record
    }

    pub fn set_epoch(&self, epoch: u64) {
        self.lock().epoch = epoch;
    }

    /// Deep, independent copy of the full state.
    pub fn state(&self) -> RunState {
        self.lock().clone()
    }

    pub fn checkpoints(&self) -> Vec<CheckpointRecord> {
        self.lock().checkpoints.clone()
    }

    /// Recompute the stall flag and copy state for serialization. The lock
    /// is held for the copy only; callers serialize and write it out after
    /// release.
    pub fn snapshot(&self, stall_timeout: Duration) -> Snapshot {
        let mut state = self.lock();
        let now = Utc::now();
        let idle = now
            .signed_duration_since(state.last_update_time)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;
        if idle > stall_timeout.as_secs_f64() && !state.phase.exempt_from_stall() {
            state.stalled = true;
        }
        let elapsed = now
            .signed_duration_since(state.start_time)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;
        Snapshot {
            state: state.clone(),
            elapsed_seconds: elapsed,
        }
    }
}
