//! In-memory run state: the single mutable aggregate the snapshot is
//! derived from.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Maximum retained log lines. Oldest lines are dropped first.
pub const MAX_LOG_LINES: usize = 500;

/// Maximum retained points per metric series. Oldest points are dropped
/// first.
pub const MAX_METRIC_POINTS: usize = 100_000;

/// Training phase. Conceptually a closed set; `Other` carries free-form
/// names so callers are never rejected over presentation-only data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Init,
    Train,
    Eval,
    Save,
    Done,
    Failed,
    Other(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Init => "init",
            Self::Train => "train",
            Self::Eval => "eval",
            Self::Save => "save",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Other(name) => name,
        }
    }

    /// Phases in which a quiet run is expected and never counts as a stall.
    pub fn exempt_from_stall(&self) -> bool {
        matches!(self, Self::Init | Self::Done)
    }
}

impl From<&str> for Phase {
    fn from(name: &str) -> Self {
        match name {
            "init" => Self::Init,
            "train" => Self::Train,
            "eval" => Self::Eval,
            "save" => Self::Save,
            "done" => Self::Done,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Phase::from(name.as_str()))
    }
}

/// Severity of a structured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// A telemetry or checkpoint-metadata value. Kept to a small closed set of
/// kinds so the snapshot schema stays stable for any consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Number(f64),
    Series(Vec<f64>),
    Text(String),
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for TelemetryValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for TelemetryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<f64>> for TelemetryValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Series(values)
    }
}

/// Open mapping of sensor or metadata name to value.
pub type TelemetryMap = BTreeMap<String, TelemetryValue>;

/// One point in a metric series. A `value` of `None` with `restart` set is
/// the resume sentinel: it renders as a gap instead of a misleading
/// connected line across a process restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub step: u64,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub restart: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl MetricPoint {
    pub fn new(step: u64, value: f64) -> Self {
        Self {
            step,
            value: Some(value),
            restart: false,
        }
    }

    pub fn restart_marker(step: u64) -> Self {
        Self {
            step,
            value: None,
            restart: true,
        }
    }
}

/// A structured log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub line: String,
    #[serde(default)]
    pub level: LogLevel,
}

/// A recorded checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub path: String,
    pub step: u64,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: TelemetryMap,
}

/// A recorded training failure. Sticky until overwritten by a later
/// `failure()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub traceback: Option<String>,
    pub step: u64,
    pub time: DateTime<Utc>,
    pub oom_suspected: bool,
}

/// Everything known about the run. Owned exclusively by the state store;
/// everything handed out is a deep copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub hostname: String,
    pub pid: u32,
    pub phase: Phase,
    pub step: u64,
    pub epoch: u64,
    pub start_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub rank: u32,
    pub world_size: u32,
    /// Metric name -> ordered points, insertion order = arrival order.
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    /// Most recent telemetry snapshot, replaced wholesale on each update.
    pub system: TelemetryMap,
    pub checkpoints: Vec<CheckpointRecord>,
    /// Ring buffer capped at [`MAX_LOG_LINES`].
    pub logs: VecDeque<LogEntry>,
    pub failure: Option<FailureRecord>,
    /// Derived at flush time, never inferred eagerly on mutation.
    pub stalled: bool,
    pub restart_count: u32,
}

impl RunState {
    pub fn new(rank: u32, world_size: u32) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            hostname: hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            phase: Phase::Init,
            step: 0,
            epoch: 0,
            start_time: now,
            last_update_time: now,
            last_heartbeat: now,
            rank,
            world_size,
            metrics: BTreeMap::new(),
            system: TelemetryMap::new(),
            checkpoints: Vec::new(),
            logs: VecDeque::new(),
            failure: None,
            stalled: false,
            restart_count: 0,
        }
    }
}
