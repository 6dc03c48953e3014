//! Event record types for the audit trail.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Phase, TelemetryMap};

/// Tags attached to a metric event. Audit trail only; never stored in
/// run state.
pub type MetricTags = BTreeMap<String, String>;

/// Payload of a single ingested event, discriminated by `type` on the
/// wire. Log lines, heartbeats and epoch updates mutate state only and
/// are not event-logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReporterEvent {
    Metric {
        name: String,
        value: f64,
        step: u64,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        tags: MetricTags,
    },
    Phase {
        phase: Phase,
    },
    Checkpoint {
        path: String,
        step: u64,
        time: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        metadata: TelemetryMap,
    },
    System {
        stats: TelemetryMap,
    },
    Failure {
        kind: String,
        message: String,
        traceback: Option<String>,
        step: u64,
        oom_suspected: bool,
    },
}

/// A single line in `events.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ReporterEvent,
}

impl EventRecord {
    pub fn new(event: ReporterEvent) -> Self {
        Self {
            ts: Utc::now(),
            event,
        }
    }
}
