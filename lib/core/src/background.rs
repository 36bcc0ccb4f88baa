// Background cache sweeping
// A single named worker thread wakes on a fixed interval and purges expired
// entries from every registered cache tier until shut down.

use crate::cache::TtlCache;
use crate::error::Result;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Anything the sweeper can purge
pub trait SweepJob: Send + Sync + 'static {
    /// Remove expired entries, returning how many were dropped
    fn sweep(&self) -> usize;
    fn job_name(&self) -> &str;
}

impl<V: Clone + Send + Sync + 'static> SweepJob for TtlCache<V> {
    fn sweep(&self) -> usize {
        self.purge_expired()
    }

    fn job_name(&self) -> &str {
        self.name()
    }
}

struct SweepSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

/// Periodic purge of expired cache entries with an explicit lifecycle
pub struct CacheSweeper {
    signal: Arc<SweepSignal>,
    handle: Mutex<Option<JoinHandle<()>>>,
    sweeps: Arc<AtomicU64>,
}

impl CacheSweeper {
    /// Spawn the sweeper thread
    pub fn start(interval: Duration, jobs: Vec<Arc<dyn SweepJob>>) -> Result<Self> {
        let signal = Arc::new(SweepSignal {
            stopped: Mutex::new(false),
            condvar: Condvar::new(),
        });
        let sweeps = Arc::new(AtomicU64::new(0));

        let thread_signal = signal.clone();
        let thread_sweeps = sweeps.clone();
        let handle = thread::Builder::new()
            .name("cache-sweeper".to_string())
            .spawn(move || {
                let mut stopped = thread_signal.stopped.lock();
                loop {
                    if *stopped {
                        break;
                    }
                    let timed_out = thread_signal
                        .condvar
                        .wait_for(&mut stopped, interval)
                        .timed_out();
                    if *stopped {
                        break;
                    }
                    if timed_out {
                        // Release the lock so shutdown never waits on a sweep
                        MutexGuard::unlocked(&mut stopped, || {
                            run_sweep(&jobs);
                            thread_sweeps.fetch_add(1, Ordering::Relaxed);
                        });
                    }
                }
            })?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "cache sweeper started");
        Ok(Self {
            signal,
            handle: Mutex::new(Some(handle)),
            sweeps,
        })
    }

    /// Number of completed sweep passes
    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Stop the sweeper and wait for its thread. Safe to call more than once.
    pub fn shutdown(&self) {
        {
            let mut stopped = self.signal.stopped.lock();
            *stopped = true;
        }
        self.signal.condvar.notify_all();

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("cache sweeper thread panicked");
            }
            tracing::debug!("cache sweeper stopped");
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Purge every job once
pub fn run_sweep(jobs: &[Arc<dyn SweepJob>]) -> usize {
    let mut purged = 0;
    for job in jobs {
        let removed = job.sweep();
        if removed > 0 {
            tracing::debug!(tier = job.job_name(), removed, "purged expired cache entries");
        }
        purged += removed;
    }
    purged
}
