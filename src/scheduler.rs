//! Drives `FeatureCache::refresh` on a cadence.
//!
//! In periodic mode a single named worker thread refreshes immediately and
//! then waits the configured interval, measured from the end of each run,
//! before the next one. At most one scheduled refresh is in flight.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use crate::cache::FeatureCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::source::FeatureSource;

/// How a `RefreshScheduler` keeps its cache current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
    /// Load once, synchronously, when the scheduler starts.
    OneShot,
    /// Reload in the background, pausing this long after every run.
    Periodic(Duration),
}

/// Stop flag shared with the worker thread.
#[derive(Default)]
struct Shutdown {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl Shutdown {
    fn trigger(&self) {
        *self.stopped.lock() = true;
        let _ignore = self.signal.notify_all();
    }

    /// Sleep for `timeout` or until triggered; returns whether it was triggered.
    ///
    /// A timeout too large to express as a deadline waits for the trigger only.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = self.stopped.lock();
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    if self.signal.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
                None => self.signal.wait(&mut stopped),
            }
        }
        *stopped
    }
}

/// Handle to the refresh loop of a `FeatureCache`.
///
/// Dropping the handle stops further refreshes without waiting for a run in
/// progress; [`RefreshScheduler::stop`] also joins the worker.
pub struct RefreshScheduler {
    mode: RefreshMode,
    shutdown: Arc<Shutdown>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Start refreshing `cache` as `config` prescribes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Spawn`] if the worker thread cannot be created.
    /// A failing refresh is not an error here: it is logged, counted in the
    /// cache's stats and the previous snapshot keeps being served.
    pub fn start<S>(cache: Arc<FeatureCache<S>>, config: &CacheConfig) -> Result<Self>
    where
        S: FeatureSource + 'static,
    {
        Self::with_mode(cache, config.refresh_mode(), &config.thread_name)
    }

    /// Start refreshing `cache` in the given mode.
    pub fn with_mode<S>(
        cache: Arc<FeatureCache<S>>,
        mode: RefreshMode,
        thread_name: &str,
    ) -> Result<Self>
    where
        S: FeatureSource + 'static,
    {
        let shutdown = Arc::new(Shutdown::default());
        let handle = match mode {
            RefreshMode::OneShot => {
                run_refresh(&cache);
                debug!("feature cache loaded once, periodic refresh disabled");
                None
            }
            RefreshMode::Periodic(interval) => {
                let worker_shutdown = Arc::clone(&shutdown);
                let handle = thread::Builder::new()
                    .name(thread_name.to_owned())
                    .spawn(move || {
                        debug!("feature cache refresh worker started, interval {interval:?}");
                        loop {
                            run_refresh(&cache);
                            if worker_shutdown.wait(interval) {
                                break;
                            }
                        }
                        debug!("feature cache refresh worker stopped");
                    })
                    .map_err(CacheError::Spawn)?;
                Some(handle)
            }
        };
        Ok(Self {
            mode,
            shutdown,
            handle,
        })
    }

    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Whether a background worker is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the worker and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("feature cache refresh worker panicked");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Run one refresh, containing both errors and panics from the source.
fn run_refresh<S: FeatureSource>(cache: &FeatureCache<S>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cache.refresh())) {
        cache.record_failure(&CacheError::RefreshPanicked {
            message: panic_message(payload.as_ref()),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
