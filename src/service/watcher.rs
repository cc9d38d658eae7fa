//! Background thread that drives periodic reloads.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Default)]
struct Signal {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Handle to a running watcher thread.
///
/// The thread sleeps for the poll interval, runs its tick, and repeats until
/// cancelled or until the tick reports that its target is gone. Cancelling
/// never waits for a tick in progress.
pub(crate) struct ReloadWatcher {
    name: String,
    signal: Arc<Signal>,
}

impl ReloadWatcher {
    /// Spawn the watcher thread.
    ///
    /// `tick` returns `false` to end the loop.
    pub(crate) fn spawn<F>(name: String, interval: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let signal = Arc::new(Signal::default());
        let thread_signal = signal.clone();
        let thread_name = name.clone();

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                debug!(watcher = %thread_name, interval_ms = interval.as_millis() as u64, "Reload watcher started");
                while wait(&thread_signal, interval) && tick() {}
                debug!(watcher = %thread_name, "Reload watcher exited");
            })
            .map_err(|e| Error::io(format!("spawning watcher thread {name}"), e))?;

        info!(watcher = %name, interval_ms = interval.as_millis() as u64, "Scheduled reload watcher");
        Ok(Self { name, signal })
    }

    /// Ask the thread to exit after its current tick, if any.
    pub(crate) fn cancel(&self) {
        let mut cancelled = self.signal.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.signal.wakeup.notify_all();
            debug!(watcher = %self.name, "Reload watcher cancelled");
        }
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        *self.signal.cancelled.lock()
    }
}

impl Drop for ReloadWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sleep for `interval` unless cancelled first. Returns false once cancelled.
fn wait(signal: &Signal, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    let mut cancelled = signal.cancelled.lock();
    while !*cancelled {
        if signal.wakeup.wait_until(&mut cancelled, deadline).timed_out() {
            break;
        }
    }
    !*cancelled
}
