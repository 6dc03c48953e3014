//! Shutdown hooks and termination-signal interception.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use signal_hook::consts::SIGTERM;
use signal_hook::iterator::backend::Handle;
use signal_hook::iterator::Signals;
use tracing::debug;

use crate::error::Result;

/// Ordered list of actions to run once before process termination.
///
/// The reporter registers its final flush here; a host may register its
/// own teardown. [`ShutdownHooks::fire`] is public so a process-lifecycle
/// primitive (or a test) can invoke the capability directly, without a
/// real signal being delivered.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    fired: AtomicBool,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. Hooks run in registration order.
    pub fn register<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    /// Run all hooks. Only the first call runs anything; the process is
    /// expected to terminate shortly after.
    pub fn fire(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        for hook in hooks.iter() {
            hook();
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// SIGTERM watcher: runs the hook list, then chains to the default
/// disposition (normally process termination).
///
/// Signals are delivered to an ordinary thread via `signal-hook`, so the
/// hooks may take the state lock without async-signal-safety concerns.
pub(crate) struct TerminationHandler {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl TerminationHandler {
    pub fn install(hooks: Arc<ShutdownHooks>) -> Result<Self> {
        let mut signals = Signals::new([SIGTERM])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("traincard-sigterm".to_string())
            .spawn(move || {
                for sig in signals.forever() {
                    debug!("termination signal received, flushing");
                    hooks.fire();
                    let _ = signal_hook::low_level::emulate_default_handler(sig);
                }
            })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Remove the watcher. Subsequent SIGTERMs follow the default path
    /// (or whatever the host installs next).
    pub fn disarm(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for TerminationHandler {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn hooks_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let hooks = ShutdownHooks::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            hooks.register(move || order.lock().unwrap().push(i));
        }
        hooks.fire();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn fire_runs_only_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let hooks = ShutdownHooks::new();
        {
            let count = Arc::clone(&count);
            hooks.register(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        hooks.fire();
        hooks.fire();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(hooks.has_fired());
    }

    #[test]
    fn install_and_disarm_without_a_signal() {
        let hooks = Arc::new(ShutdownHooks::new());
        let mut handler = TerminationHandler::install(Arc::clone(&hooks)).unwrap();
        handler.disarm();
        assert!(!hooks.has_fired());
    }
}
