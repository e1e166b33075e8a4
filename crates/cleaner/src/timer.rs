//! Reference-counted timer shared by many consumers.
//!
//! The timer owns a thread, which is the external state here. The thread is
//! started on the first [`SharedTimer::get_timer`] and registered with a
//! [`Cleaner`]; the last matching [`SharedTimer::release_timer`] cleans it.
//! If the holder is dropped while consumers still hold references, the
//! cleaner's worker stops the thread and logs a warning.

use crate::{Cleanable, Cleaner, Tracked};
use lazyclean_core::{BoxError, Error, Result, TIMER_THREAD_NAME};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Schedules delayed work on the shared timer thread.
#[derive(Debug, Clone)]
pub struct Timer {
    handle: Handle,
}

impl Timer {
    /// Run `task` once `delay` has passed, unless the returned task is
    /// cancelled or the timer is stopped first.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> TimerTask
    where
        F: FnOnce() + Send + 'static,
    {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerTask { join }
    }
}

/// A scheduled timer task
#[derive(Debug)]
pub struct TimerTask {
    join: JoinHandle<()>,
}

impl TimerTask {
    pub fn cancel(&self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Holder that hands out one timer to any number of consumers.
pub struct SharedTimer {
    cleaner: Cleaner,
    state: Mutex<TimerState>,
}

#[derive(Default)]
struct TimerState {
    ref_count: usize,
    active: Option<ActiveTimer>,
}

struct ActiveTimer {
    timer: Timer,
    cleanable: Cleanable,
    _owner: Tracked<()>,
}

impl SharedTimer {
    pub fn new(cleaner: &Cleaner) -> Self {
        Self {
            cleaner: cleaner.clone(),
            state: Mutex::new(TimerState::default()),
        }
    }

    /// Take a reference to the timer, starting its thread on first use.
    pub fn get_timer(&self) -> Result<Timer> {
        let mut state = self.state.lock();

        let timer = match &state.active {
            Some(active) => active.timer.clone(),
            None => {
                let active = self.start()?;
                let timer = active.timer.clone();
                state.active = Some(active);
                timer
            }
        };

        state.ref_count += 1;
        Ok(timer)
    }

    /// Drop a reference taken with [`get_timer`](Self::get_timer). The last
    /// one stops the timer thread.
    pub fn release_timer(&self) -> Result<()> {
        let active = {
            let mut state = self.state.lock();
            match state.ref_count {
                0 => {
                    tracing::warn!("Shared timer released more often than it was acquired");
                    return Ok(());
                }
                1 => {
                    state.ref_count = 0;
                    state.active.take()
                }
                _ => {
                    state.ref_count -= 1;
                    tracing::debug!(
                        "Shared timer still has {} consumers",
                        state.ref_count
                    );
                    return Ok(());
                }
            }
        };

        match active {
            Some(active) => active.cleanable.clean(),
            None => Ok(()),
        }
    }

    /// Number of consumers currently holding the timer
    pub fn ref_count(&self) -> usize {
        self.state.lock().ref_count
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active.is_some()
    }

    fn start(&self) -> Result<ActiveTimer> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(TIMER_THREAD_NAME)
            .enable_time()
            .build()
            .map_err(|e| Error::runtime(format!("failed to start timer thread: {e}")))?;

        let timer = Timer {
            handle: runtime.handle().clone(),
        };
        let owner = Tracked::new(());
        let cleanable = self
            .cleaner
            .register(&owner, move |leak: bool| stop_timer(runtime, leak));

        tracing::debug!("Started shared timer thread");
        Ok(ActiveTimer {
            timer,
            cleanable,
            _owner: owner,
        })
    }
}

impl fmt::Debug for SharedTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SharedTimer")
            .field("ref_count", &state.ref_count)
            .field("active", &state.active.is_some())
            .finish()
    }
}

fn stop_timer(runtime: Runtime, leak: bool) -> std::result::Result<(), BoxError> {
    if leak {
        tracing::warn!("Shared timer was dropped while still in use, stopping its thread");
    }
    runtime.shutdown_background();
    Ok(())
}
