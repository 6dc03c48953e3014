//! Resume continuity: seed fresh state from a prior run's snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::state::{MetricPoint, RunState};

/// Lenient view of a prior snapshot. Every field is defaulted so a partial
/// or older document still parses.
#[derive(Debug, Default, Deserialize)]
struct PriorSnapshot {
    #[serde(default)]
    metrics: BTreeMap<String, Vec<MetricPoint>>,
    #[serde(default)]
    step: u64,
    #[serde(default)]
    restart_count: u32,
}

/// Carry metric history forward from a prior snapshot, if one exists at
/// `snapshot_path`. Returns whether prior state was restored.
///
/// Each restored series gets a restart sentinel appended at the resumed
/// step, so a renderer shows a visible discontinuity instead of a line
/// connecting across the restart. All failures are swallowed: continuity
/// is a convenience, never a correctness requirement.
pub(crate) fn apply_prior_run(state: &mut RunState, snapshot_path: &Path) -> bool {
    let raw = match fs::read_to_string(snapshot_path) {
        Ok(raw) => raw,
        Err(_) => return false,
    };
    let prior: PriorSnapshot = match serde_json::from_str(&raw) {
        Ok(prior) => prior,
        Err(e) => {
            debug!("ignoring unparseable prior snapshot: {e}");
            return false;
        }
    };

    state.restart_count = prior.restart_count + 1;
    state.step = prior.step;
    state.metrics = prior.metrics;
    for series in state.metrics.values_mut() {
        series.push(MetricPoint::restart_marker(state.step));
    }
    info!(
        restart_count = state.restart_count,
        step = state.step,
        "resuming from prior run state"
    );
    true
}
