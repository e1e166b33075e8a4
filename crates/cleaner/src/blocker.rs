//! Cooperative wait on the unreachable-owner queue.
//!
//! The worker runs on a pool meant for short tasks, so it never parks a pool
//! thread: it polls the queue without blocking first and only then awaits a
//! single bounded receive. While it waits, the worker span is entered so the
//! wait shows up under the worker's name in diagnostics.

use crate::list::Key;
use lazyclean_utils::tracing::worker_span;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;
use tracing::{Instrument, Span};

/// Outcome of one [`QueueBlocker::block`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
    /// An observation is ready to be drained.
    Received,
    TimedOut,
    /// Someone called [`Cleaner::interrupt`](crate::Cleaner::interrupt), or
    /// the queue closed.
    Interrupted,
}

pub(crate) struct QueueBlocker<'a> {
    receiver: &'a mut UnboundedReceiver<Key>,
    interrupt: &'a Notify,
    timeout: Duration,
    span: Span,
    taken: Option<Key>,
}

impl<'a> QueueBlocker<'a> {
    pub(crate) fn new(
        receiver: &'a mut UnboundedReceiver<Key>,
        interrupt: &'a Notify,
        timeout: Duration,
        worker_name: &str,
    ) -> Self {
        Self {
            receiver,
            interrupt,
            timeout,
            span: worker_span(worker_name),
            taken: None,
        }
    }

    /// Non-blocking check; true if an observation is held.
    pub(crate) fn is_releasable(&mut self) -> bool {
        if self.taken.is_some() {
            return true;
        }
        self.taken = self.receiver.try_recv().ok();
        self.taken.is_some()
    }

    pub(crate) async fn block(&mut self) -> Wait {
        if self.is_releasable() {
            return Wait::Received;
        }

        let Self {
            receiver,
            interrupt,
            timeout,
            span,
            taken,
        } = self;

        let wait = async {
            tokio::select! {
                biased;
                () = interrupt.notified() => Wait::Interrupted,
                received = tokio::time::timeout(*timeout, receiver.recv()) => match received {
                    Ok(Some(key)) => {
                        *taken = Some(key);
                        Wait::Received
                    }
                    Ok(None) => Wait::Interrupted,
                    Err(_) => Wait::TimedOut,
                },
            }
        };

        wait.instrument(span.clone()).await
    }

    /// Hand over the held observation, if any.
    pub(crate) fn drain_one(&mut self) -> Option<Key> {
        self.taken.take()
    }
}
