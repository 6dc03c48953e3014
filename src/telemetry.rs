//! Host system telemetry sampling.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sysinfo::System;

use crate::error::Result;
use crate::state::{TelemetryMap, TelemetryValue};
use crate::Reporter;

/// Collect one telemetry snapshot from the host: CPU utilization, memory,
/// and load average.
pub fn sample_host(sys: &mut System) -> TelemetryMap {
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let mut stats = TelemetryMap::new();
    stats.insert(
        "cpu_percent".to_string(),
        TelemetryValue::Number(f64::from(sys.global_cpu_usage())),
    );
    stats.insert(
        "ram_used_gb".to_string(),
        TelemetryValue::Number(bytes_to_gb(sys.used_memory())),
    );
    stats.insert(
        "ram_total_gb".to_string(),
        TelemetryValue::Number(bytes_to_gb(sys.total_memory())),
    );
    let load = System::load_average();
    stats.insert("load_avg_1m".to_string(), TelemetryValue::Number(load.one));
    stats
}

fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0_f64.powi(3) * 100.0).round() / 100.0
}

/// Background sampler that feeds [`Reporter::system`] on a fixed
/// interval.
///
/// Holds its own clone of the reporter; sampling stops when [`stop`] is
/// called or the sampler is dropped. On non-primary ranks the samples
/// land in local state only, since the reporter persists nothing there.
///
/// [`stop`]: SystemSampler::stop
pub struct SystemSampler {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SystemSampler {
    pub fn start(reporter: Reporter, interval: Duration) -> Result<Self> {
        let (stop, ticks) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("traincard-telemetry".to_string())
            .spawn(move || {
                let mut sys = System::new();
                loop {
                    match ticks.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            reporter.system(sample_host(&mut sys));
                        }
                        _ => break,
                    }
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop sampling and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shut_down();
    }

    fn shut_down(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SystemSampler {
    fn drop(&mut self) {
        self.shut_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_includes_cpu_and_memory_keys() {
        let mut sys = System::new();
        let stats = sample_host(&mut sys);
        assert!(stats.contains_key("cpu_percent"));
        assert!(stats.contains_key("ram_used_gb"));
        assert!(stats.contains_key("ram_total_gb"));
        assert!(stats.contains_key("load_avg_1m"));
        assert!(matches!(stats["ram_total_gb"], TelemetryValue::Number(gb) if gb > 0.0));
    }

    #[test]
    fn bytes_round_to_two_decimals() {
        assert_eq!(bytes_to_gb(24 * 1024 * 1024 * 1024), 24.0);
        assert_eq!(bytes_to_gb(1024 * 1024 * 1024 + 5 * 1024 * 1024), 1.0);
    }
}
