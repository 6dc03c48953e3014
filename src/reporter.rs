//! The Reporter: public ingestion API and flush orchestration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::ReporterConfig;
use crate::error::Result;
use crate::events::{EventLog, EventRecord, MetricTags, ReporterEvent};
use crate::persist::{
    self, CheckpointIndex, SnapshotWriter, CHECKPOINTS_FILE, EVENTS_FILE, SNAPSHOT_FILE,
};
use crate::scheduler::FlushScheduler;
use crate::shutdown::{ShutdownHooks, TerminationHandler};
use crate::state::{LogLevel, Phase, RunState, StateStore, TelemetryMap};

/// Shared internals behind every [`Reporter`] clone.
pub(crate) struct ReporterCore {
    config: ReporterConfig,
    dir: PathBuf,
    store: StateStore,
    event_log: EventLog,
    snapshot: SnapshotWriter,
    checkpoint_index: CheckpointIndex,
    metrics_since_flush: AtomicU64,
    closed: AtomicBool,
}

impl ReporterCore {
    /// Write the canonical snapshot. Best-effort: every failure is
    /// discarded after a breadcrumb so the training loop never sees it.
    pub(crate) fn flush(&self) {
        if !self.store.is_primary() {
            return;
        }
        let snapshot = self.store.snapshot(self.config.stall_timeout);
        if let Err(e) = self.snapshot.write(&snapshot) {
            debug!("snapshot flush failed: {e}");
        }
    }

    fn append_event(&self, event: ReporterEvent) {
        self.event_log.append(&EventRecord::new(event));
    }

    fn write_checkpoint_index(&self) {
        if !self.store.is_primary() {
            return;
        }
        if let Err(e) = self.checkpoint_index.write(&self.store.checkpoints()) {
            debug!("checkpoint index write failed: {e}");
        }
    }
}

/// Background machinery owned jointly by all reporter clones, torn down
/// by `finish()`.
struct Runtime {
    scheduler: Option<FlushScheduler>,
    termination: Option<TerminationHandler>,
}

/// Framework-agnostic training event collector.
///
/// Ingests metrics, logs, phase changes, checkpoints, telemetry,
/// heartbeats and failures from the instrumented job, and continuously
/// materializes them into an atomically-replaced snapshot that a renderer
/// can read at any moment, while the job runs or after it crashed.
///
/// ```no_run
/// use traincard::Reporter;
///
/// # fn train_step(batch: &()) -> f64 { 0.0 }
/// # fn main() -> traincard::Result<()> {
/// let reporter = Reporter::with_defaults()?;
/// reporter.phase("train");
/// for (step, batch) in [(); 10].iter().enumerate() {
///     let loss = train_step(batch);
///     reporter.metric_at("loss", loss, step as u64);
/// }
/// reporter.finish();
/// # Ok(())
/// # }
/// ```
///
/// All methods are safe to call from multiple threads. Cloning is cheap;
/// every clone shares the same underlying state.
#[derive(Clone)]
pub struct Reporter {
    core: Arc<ReporterCore>,
    hooks: Arc<ShutdownHooks>,
    runtime: Arc<Mutex<Runtime>>,
}

impl Reporter {
    /// Construct a reporter. This is the only loud failure path: an
    /// unusable output location is a configuration error the caller must
    /// see immediately.
    pub fn new(config: ReporterConfig) -> Result<Self> {
        let dir = config.resolved_output_dir();
        fs::create_dir_all(&dir)?;

        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let mut state = RunState::new(config.rank, config.world_size);
        if config.is_primary() {
            persist::apply_prior_run(&mut state, &snapshot_path);
        }

        let event_log = if config.is_primary() {
            EventLog::open(dir.join(EVENTS_FILE))?
        } else {
            EventLog::disabled(dir.join(EVENTS_FILE))
        };

        let primary = config.is_primary();
        let core = Arc::new(ReporterCore {
            store: StateStore::new(state, primary),
            event_log,
            snapshot: SnapshotWriter::new(snapshot_path),
            checkpoint_index: CheckpointIndex::new(dir.join(CHECKPOINTS_FILE)),
            metrics_since_flush: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            dir,
            config,
        });

        let hooks = Arc::new(ShutdownHooks::new());
        {
            let core = Arc::downgrade(&core);
            hooks.register(move || {
                if let Some(core) = core.upgrade() {
                    core.flush();
                }
            });
        }

        let termination = if core.config.install_signal_handler {
            Some(TerminationHandler::install(Arc::clone(&hooks))?)
        } else {
            None
        };

        let scheduler = FlushScheduler::start(Arc::downgrade(&core), core.config.flush_interval)?;

        Ok(Self {
            core,
            hooks,
            runtime: Arc::new(Mutex::new(Runtime {
                scheduler: Some(scheduler),
                termination,
            })),
        })
    }

    /// Construct with [`ReporterConfig::default`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(ReporterConfig::default())
    }

    /// Directory holding `latest.json`, `events.jsonl` and
    /// `checkpoints.json`.
    pub fn output_dir(&self) -> &Path {
        &self.core.dir
    }

    /// The shutdown-hook registry. Hosts with their own process-lifecycle
    /// handling can register teardown here or invoke `fire()` themselves.
    pub fn shutdown_hooks(&self) -> &Arc<ShutdownHooks> {
        &self.hooks
    }

    /// Record a scalar metric at the current step.
    pub fn metric(&self, name: &str, value: f64) {
        self.record_metric(name, value, None, MetricTags::new());
    }

    /// Record a scalar metric at an explicit step.
    pub fn metric_at(&self, name: &str, value: f64, step: u64) {
        self.record_metric(name, value, Some(step), MetricTags::new());
    }

    /// Record a scalar metric with audit-trail tags. Tags go to the event
    /// log only, never into run state.
    pub fn metric_tagged(&self, name: &str, value: f64, step: u64, tags: MetricTags) {
        self.record_metric(name, value, Some(step), tags);
    }

    fn record_metric(&self, name: &str, value: f64, step: Option<u64>, tags: MetricTags) {
        let Some(step) = self.core.store.record_metric(name, value, step) else {
            return; // non-primary ranks stay silent
        };
        self.core.append_event(ReporterEvent::Metric {
            name: name.to_string(),
            value,
            step,
            tags,
        });
        let since = self.core.metrics_since_flush.fetch_add(1, Ordering::Relaxed) + 1;
        if since >= self.core.config.flush_every_n_metrics {
            self.core.metrics_since_flush.store(0, Ordering::Relaxed);
            self.core.flush();
        }
    }

    /// Append a structured log line at info level.
    pub fn log(&self, line: &str) {
        self.log_with_level(line, LogLevel::Info);
    }

    /// Append a structured log line with an explicit level.
    pub fn log_with_level(&self, line: &str, level: LogLevel) {
        self.core.store.append_log(line, level);
    }

    /// Mark the current training phase: `"train"`, `"eval"`, `"save"`, ...
    pub fn phase(&self, phase: impl Into<Phase>) {
        let phase = phase.into();
        self.core.store.set_phase(phase.clone());
        self.core.append_event(ReporterEvent::Phase { phase });
    }

    /// Record a saved checkpoint, stamped with the current step. The
    /// checkpoint index is rewritten immediately, not on the next flush.
    pub fn checkpoint(&self, path: &str) {
        self.checkpoint_with_metadata(path, TelemetryMap::new());
    }

    /// Record a saved checkpoint with metadata.
    pub fn checkpoint_with_metadata(&self, path: &str, metadata: TelemetryMap) {
        let record = self.core.store.record_checkpoint(path, metadata);
        self.core.append_event(ReporterEvent::Checkpoint {
            path: record.path,
            step: record.step,
            time: record.time,
            metadata: record.metadata,
        });
        self.core.write_checkpoint_index();
    }

    /// Record a system telemetry snapshot, replacing the previous one.
    pub fn system(&self, stats: TelemetryMap) {
        self.core.store.set_system(stats.clone());
        self.core.append_event(ReporterEvent::System { stats });
    }

    /// Signal liveness; resets the stall flag.
    pub fn heartbeat(&self) {
        self.core.store.touch_heartbeat();
    }

    /// Record a training failure and flush synchronously, so a crash
    /// immediately afterward still persists it.
    pub fn failure(&self, kind: &str, message: &str, traceback: Option<&str>) {
        let record = self
            .core
            .store
            .record_failure(kind, message, traceback.map(str::to_string));
        self.core.append_event(ReporterEvent::Failure {
            kind: record.kind,
            message: record.message,
            traceback: record.traceback,
            step: record.step,
            oom_suspected: record.oom_suspected,
        });
        self.core.flush();
    }

    /// Update the epoch counter.
    pub fn epoch(&self, epoch: u64) {
        self.core.store.set_epoch(epoch);
    }

    /// Deep, independent copy of the current state, safe to serialize or
    /// mutate without affecting the reporter.
    pub fn state(&self) -> RunState {
        self.core.store.state()
    }

    /// Force a synchronous snapshot write. The capability invoked by the
    /// shutdown path; also useful for hosts with their own flush timing.
    pub fn flush_now(&self) {
        self.core.flush();
    }

    /// Flush pending state, stop the background flush loop, and stand
    /// down the termination watcher. Idempotent; the phase is forced to
    /// `done`.
    pub fn finish(&self) {
        if self.core.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.core.store.set_phase(Phase::Done);
        let mut runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(scheduler) = runtime.scheduler.take() {
            scheduler.stop();
        }
        self.core.flush();
        if let Some(mut termination) = runtime.termination.take() {
            termination.disarm();
        }
    }
}
