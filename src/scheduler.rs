//! Background flush loop with an explicit stop channel.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Result;
use crate::reporter::ReporterCore;

/// Periodic flush driver, independent of event volume.
///
/// The loop blocks on a channel with a timeout instead of sleeping, so a
/// stop message (or the sender dropping) ends it immediately rather than
/// after the remainder of an interval. The loop holds only a weak
/// reference to the reporter internals; when the last reporter handle is
/// dropped the loop exits on its next wake.
pub(crate) struct FlushScheduler {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    pub fn start(core: Weak<ReporterCore>, interval: Duration) -> Result<Self> {
        let (stop, ticks) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("traincard-flush".to_string())
            .spawn(move || loop {
                match ticks.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(core) = core.upgrade() else { break };
                        core.flush();
                    }
                    _ => break,
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the loop and wait for it to exit.
    pub fn stop(mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        let _ = self.stop.send(());
    }
}
