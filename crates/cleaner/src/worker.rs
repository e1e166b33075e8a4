//! Background worker: drains leaked owners and runs their actions.
//!
//! At most one worker runs per registry. It is an ordinary task on a shared
//! multi-thread runtime, so the registry never owns a thread, and it exits as
//! soon as it finds the pending list empty.

use crate::blocker::{QueueBlocker, Wait};
use crate::registry::{panic_message, Shared};
use futures::FutureExt;
use lazyclean_utils::spawn_handle;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;

/// Spawn a worker for `shared`. Returns whether the spawn was handed to a
/// runtime.
///
/// Must be called without the registry lock held: a runtime that is already
/// shut down drops the task on the spot, and the task's guard then takes the
/// lock to clear the running flag.
pub(crate) fn start(shared: &Arc<Shared>) -> bool {
    let handle = match spawn_handle(shared.config.runtime.as_ref(), &shared.config.worker_name) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!("Unable to start cleanup worker: {}", e);
            return false;
        }
    };

    let guard = RunningGuard {
        shared: Arc::clone(shared),
        stopped: false,
    };
    handle.spawn(supervise(guard));
    true
}

/// Clears the running flag if the worker ends without seeing an empty list,
/// which happens on a panic or when its runtime drops the task, polled or not.
struct RunningGuard {
    shared: Arc<Shared>,
    stopped: bool,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if !self.stopped {
            self.shared.clear_running();
        }
    }
}

async fn supervise(mut guard: RunningGuard) {
    let shared = Arc::clone(&guard.shared);

    match AssertUnwindSafe(run(&shared)).catch_unwind().await {
        Ok(()) => guard.stopped = true,
        Err(panic) => {
            tracing::warn!(
                "Unexpected panic in cleanup worker main loop: {}",
                panic_message(panic.as_ref())
            );
        }
    }
}

async fn run(shared: &Shared) {
    let mut receiver = shared.receiver.lock().await;
    let mut blocker = QueueBlocker::new(
        &mut receiver,
        &shared.interrupt,
        shared.config.idle_timeout,
        &shared.config.worker_name,
    );
    let mut last_sweep = Instant::now();
    tracing::debug!("Cleanup worker started");

    while !shared.check_empty() {
        let wait = blocker.block().await;
        match wait {
            Wait::Received => {
                if let Some(key) = blocker.drain_one() {
                    shared.clean_leaked(key);
                }
            }
            Wait::TimedOut => {}
            Wait::Interrupted => {
                if shared.check_empty() {
                    tracing::debug!(
                        "Got interrupt and the cleanup queue is empty, stopping the cleanup worker"
                    );
                    return;
                }
                tracing::debug!(
                    "Got interrupt and the cleanup queue is not empty, ignoring the interrupt"
                );
            }
        }

        // A steady stream of tracked leaks must not starve the weak sweep.
        if wait == Wait::TimedOut || last_sweep.elapsed() >= shared.config.idle_timeout {
            let found = shared.sweep();
            if found > 0 {
                tracing::debug!("Found {} unreachable weakly observed owners", found);
            }
            last_sweep = Instant::now();
        }
    }

    tracing::debug!("Cleanup queue is empty, stopping the cleanup worker");
}
