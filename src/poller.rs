//! Background scheduling loop.
//!
//! A `Poller` runs a job on a dedicated thread at a fixed cadence:
//! one seeding pass immediately, then one pass per interval. Each wait only
//! covers what is left of the current interval, so slow passes do not push
//! the schedule back cumulatively. A panicking pass is logged and the loop
//! carries on with the next tick.
//!
//! ```text
//!   start()            stop()              worker exits
//! Idle ──────► Running ──────► Stopping ─────────────► Idle
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`Poller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopping,
}

/// Stop flag with an interruptible wait.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    fn request(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    /// Waits up to `timeout`. Returns `true` if a stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            stopped = self
                .cond
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

struct Worker {
    handle: JoinHandle<()>,
    signal: Arc<StopSignal>,
    // disconnects when the worker thread ends
    done: mpsc::Receiver<()>,
}

struct Inner {
    state: PollerState,
    worker: Option<Worker>,
}

/// Runs a collection job periodically on a background thread.
pub struct Poller {
    interval: Duration,
    stop_timeout: Duration,
    inner: Mutex<Inner>,
}

impl Poller {
    /// Creates an idle poller.
    ///
    /// # Arguments
    /// * `interval` - Time between the starts of two passes
    /// * `stop_timeout` - How long `stop()` waits for the thread to finish
    pub fn new(interval: Duration, stop_timeout: Duration) -> Self {
        Self {
            interval,
            stop_timeout,
            inner: Mutex::new(Inner {
                state: PollerState::Idle,
                worker: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PollerState {
        self.lock().state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Launches the background loop running `job` once per interval.
    ///
    /// Returns `false` without doing anything if the poller is not idle or
    /// the thread could not be spawned.
    pub fn start<F>(&self, job: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut inner = self.lock();
        if inner.state != PollerState::Idle {
            warn!(state = ?inner.state, "poller already running, start ignored");
            return false;
        }

        let signal = Arc::new(StopSignal::default());
        let (done_tx, done) = mpsc::channel();
        let interval = self.interval;
        let worker_signal = Arc::clone(&signal);

        let spawned = thread::Builder::new()
            .name("procsnap-poller".to_string())
            .spawn(move || {
                run_loop(job, interval, &worker_signal);
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                inner.worker = Some(Worker {
                    handle,
                    signal,
                    done,
                });
                inner.state = PollerState::Running;
                info!(interval_ms = interval.as_millis() as u64, "poller started");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to spawn poller thread");
                false
            }
        }
    }

    /// Stops the loop and waits for the thread, at most `stop_timeout`.
    ///
    /// Idempotent, and a no-op when the poller was never started. A thread
    /// that does not finish in time is detached with a warning.
    pub fn stop(&self) {
        let worker = {
            let mut inner = self.lock();
            let Some(worker) = inner.worker.take() else {
                return;
            };
            inner.state = PollerState::Stopping;
            worker
        };

        worker.signal.request();
        match worker.done.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    warn!("poller thread terminated abnormally");
                }
                info!("poller stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "poller thread did not stop in time, detaching it"
                );
            }
        }

        self.lock().state = PollerState::Idle;
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<F: FnMut()>(mut job: F, interval: Duration, signal: &StopSignal) {
    let mut passes: u64 = 0;
    loop {
        let started = Instant::now();
        run_pass(&mut job, passes);
        passes += 1;

        let elapsed = started.elapsed();
        if elapsed > interval / 2 {
            warn!(
                duration_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "collection pass took more than half the interval"
            );
        }

        if signal.wait(interval.saturating_sub(elapsed)) {
            break;
        }
    }
    debug!(passes, "poller loop exited");
}

fn run_pass<F: FnMut()>(job: &mut F, pass: u64) {
    let started = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| job())) {
        Ok(()) => debug!(
            pass,
            duration_ms = started.elapsed().as_millis() as u64,
            "collection pass finished"
        ),
        Err(payload) => error!(
            pass,
            panic = panic_message(payload.as_ref()),
            "collection pass panicked, keeping last snapshot"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
