//! Reporter construction options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`Reporter`](crate::Reporter).
///
/// Every field is independently defaultable; use struct-update syntax to
/// override a subset:
///
/// ```
/// use std::time::Duration;
/// use traincard::ReporterConfig;
///
/// let config = ReporterConfig {
///     flush_interval: Duration::from_secs(2),
///     ..ReporterConfig::default()
/// };
/// assert_eq!(config.flush_every_n_metrics, 50);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Directory for `latest.json`, `events.jsonl` and `checkpoints.json`.
    /// Defaults to `$TMPDIR/traincard/<pid>`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Interval between background snapshot flushes.
    #[serde(with = "humantime_serde", default = "default_flush_interval")]
    pub flush_interval: Duration,

    /// Also flush after this many `metric()` calls.
    #[serde(default = "default_flush_every_n_metrics")]
    pub flush_every_n_metrics: u64,

    /// How long the run may go without a progress-indicating update before
    /// the stall flag is raised at the next flush.
    #[serde(with = "humantime_serde", default = "default_stall_timeout")]
    pub stall_timeout: Duration,

    /// Distributed rank. Rank 0 is the primary: the only rank that persists
    /// reporter state.
    #[serde(default)]
    pub rank: u32,

    /// Total distributed processes.
    #[serde(default = "default_world_size")]
    pub world_size: u32,

    /// Install a SIGTERM hook that flushes one last snapshot before the
    /// process terminates. Disable for embedded or test use.
    #[serde(default = "default_true")]
    pub install_signal_handler: bool,
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_flush_every_n_metrics() -> u64 {
    50
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_world_size() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            flush_interval: default_flush_interval(),
            flush_every_n_metrics: default_flush_every_n_metrics(),
            stall_timeout: default_stall_timeout(),
            rank: 0,
            world_size: default_world_size(),
            install_signal_handler: default_true(),
        }
    }
}

impl ReporterConfig {
    /// Whether this process is the primary (persisting) rank.
    pub fn is_primary(&self) -> bool {
        self.rank == 0
    }

    pub(crate) fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir()
                .join("traincard")
                .join(std::process::id().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReporterConfig::default();
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert_eq!(config.flush_every_n_metrics, 50);
        assert_eq!(config.stall_timeout, Duration::from_secs(300));
        assert_eq!(config.rank, 0);
        assert_eq!(config.world_size, 1);
        assert!(config.install_signal_handler);
        assert!(config.is_primary());
    }

    #[test]
    fn deserializes_durations_from_humantime() {
        let config: ReporterConfig =
            serde_json::from_str(r#"{"flush_interval": "2s", "stall_timeout": "10m"}"#).unwrap();
        assert_eq!(config.flush_interval, Duration::from_secs(2));
        assert_eq!(config.stall_timeout, Duration::from_secs(600));
    }

    #[test]
    fn non_zero_rank_is_not_primary() {
        let config = ReporterConfig {
            rank: 3,
            world_size: 4,
            ..ReporterConfig::default()
        };
        assert!(!config.is_primary());
    }

    #[test]
    fn default_output_dir_is_per_pid() {
        let config = ReporterConfig::default();
        let dir = config.resolved_output_dir();
        assert!(dir.ends_with(std::process::id().to_string()));
    }
}
