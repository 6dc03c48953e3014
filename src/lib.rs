//! # traincard
//!
//! Crash-safe, thread-safe observability for long-running training jobs.
//! An in-process [`Reporter`] ingests the run's event stream (scalar
//! metrics, log lines, phase transitions, telemetry snapshots, checkpoint
//! records, heartbeats, failure reports) and continuously materializes
//! it into an atomically-replaced snapshot any renderer can read at any
//! moment, while the job is still running or after it has crashed.
//!
//! ## Usage
//!
//! ```no_run
//! use traincard::Reporter;
//!
//! # fn train_step() -> f64 { 0.0 }
//! # fn main() -> traincard::Result<()> {
//! let reporter = Reporter::with_defaults()?;
//! reporter.phase("train");
//! for step in 0..1000u64 {
//!     let loss = train_step();
//!     reporter.metric_at("loss", loss, step);
//! }
//! reporter.finish();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `config` - Reporter construction options
//! - `events` - Append-only JSONL event log for audit and replay
//! - `persist` - Atomic snapshot, resume continuity, checkpoint index
//! - `reporter` - The public ingestion API
//! - `shutdown` - Shutdown hooks and SIGTERM interception
//! - `state` - In-memory run state and its mutation rules
//! - `telemetry` - Host telemetry sampling
pub mod config;
pub mod error;
pub mod events;
pub mod persist;
pub mod reporter;
mod scheduler;
pub mod shutdown;
pub mod state;
pub mod telemetry;

pub use config::ReporterConfig;
pub use error::{Error, Result};
pub use reporter::Reporter;
pub use state::{LogLevel, Phase, RunState, TelemetryMap, TelemetryValue};
pub use telemetry::SystemSampler;
