//! Append-only event log: one durable record per ingested event,
//! independent of the snapshot.

mod log;
mod types;

pub use log::EventLog;
pub use types::{EventRecord, MetricTags, ReporterEvent};
