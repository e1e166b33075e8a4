//! The registry: pending registrations, the unreachable-owner queue and the
//! worker's running flag.

use crate::config::CleanerConfig;
use crate::handle::Cleanable;
use crate::list::{Key, NodeList};
use crate::node::{CleaningAction, Node, Observation};
use crate::tracked::Tracked;
use crate::worker;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Process-wide default cleaner
static GLOBAL: Lazy<Cleaner> = Lazy::new(|| {
    let config = CleanerConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!("Invalid cleaner configuration, using defaults: {}", e);
        CleanerConfig::default()
    });
    Cleaner::new(config)
});

struct State {
    list: NodeList<Node>,
    worker_running: bool,
    weak_count: usize,
}

pub(crate) struct Shared {
    pub(crate) config: CleanerConfig,
    state: Mutex<State>,
    queue: mpsc::UnboundedSender<Key>,
    pub(crate) receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Key>>,
    pub(crate) interrupt: Notify,
}

impl Shared {
    fn new(config: CleanerConfig) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            state: Mutex::new(State {
                list: NodeList::new(),
                worker_running: false,
                weak_count: 0,
            }),
            queue,
            receiver: tokio::sync::Mutex::new(receiver),
            interrupt: Notify::new(),
        }
    }

    fn add(self: &Arc<Self>, node: Node) -> Key {
        let (key, needs_worker) = {
            let mut state = self.state.lock();
            if node.observation.is_weak() {
                state.weak_count += 1;
            }
            let key = state.list.push_front(node);
            let needs_worker = !state.worker_running;
            state.worker_running = true;
            (key, needs_worker)
        };

        if needs_worker && !worker::start(self) {
            self.clear_running();
        }
        key
    }

    /// Splice the node out; `None` if someone else already did.
    pub(crate) fn remove(&self, key: Key) -> Option<Node> {
        let node = {
            let mut state = self.state.lock();
            let node = state.list.remove(key)?;
            if node.observation.is_weak() {
                state.weak_count -= 1;
            }
            node
        };

        node.observation.unwatch(key);
        Some(node)
    }

    pub(crate) fn is_pending(&self, key: Key) -> bool {
        self.state.lock().list.contains(key)
    }

    /// Worker stop condition. Clears the running flag under the same lock
    /// `add` takes, so a racing registration either lands in the list before
    /// this check or sees the flag cleared and starts a new worker.
    pub(crate) fn check_empty(&self) -> bool {
        let mut state = self.state.lock();
        if state.list.is_empty() {
            state.worker_running = false;
            return true;
        }
        false
    }

    pub(crate) fn clear_running(&self) {
        self.state.lock().worker_running = false;
    }

    /// Enqueue weak observations whose owner is gone.
    pub(crate) fn sweep(&self) -> usize {
        let mut found = Vec::new();
        {
            let mut state = self.state.lock();
            if state.weak_count == 0 {
                return 0;
            }
            state.list.for_each_mut(|key, node| {
                if node.observation.poll_unreachable() {
                    found.push(key);
                }
            });
        }

        for key in &found {
            let _ = self.queue.send(*key);
        }
        found.len()
    }

    /// Drain step: run a leaked node's action, never letting it escape.
    pub(crate) fn clean_leaked(&self, key: Key) {
        let Some(node) = self.remove(key) else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| node.run(true))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Unexpected error while executing cleanup action: {}", e);
            }
            Err(panic) => {
                tracing::warn!(
                    "Cleanup action panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    fn sender(&self) -> mpsc::UnboundedSender<Key> {
        self.queue.clone()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Registry that runs a cleanup action at most once per owner, either when
/// the caller asks for it or, as a safety net, after the owner is gone.
///
/// Cloning is cheap and every clone shares the same registrations.
#[derive(Clone)]
pub struct Cleaner {
    shared: Arc<Shared>,
}

impl Cleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    /// The process-wide cleaner, configured from the environment on first use.
    pub fn global() -> &'static Cleaner {
        &GLOBAL
    }

    /// Register `action` to run once `owner` is cleaned or dropped.
    ///
    /// The action must not hold a clone of `owner`, or the owner can never
    /// become unreachable and only an explicit [`Cleanable::clean`] will
    /// run it.
    pub fn register<T, A>(&self, owner: &Tracked<T>, action: A) -> Cleanable
    where
        A: CleaningAction,
    {
        let key = self.shared.add(Node::new(Observation::tracked(owner), action));
        owner.watch(self.shared.sender(), key);
        Cleanable::new(Arc::clone(&self.shared), key)
    }

    /// Register against a plain `Arc` owner.
    ///
    /// The owner is observed through a `Weak` and found by sweeping, which
    /// happens on [`collect`](Self::collect) and every time the worker's wait
    /// times out. Prefer [`register`](Self::register) when the owner can be
    /// a [`Tracked`].
    pub fn register_weak<T, A>(&self, owner: &Arc<T>, action: A) -> Cleanable
    where
        T: Send + Sync + 'static,
        A: CleaningAction,
    {
        let key = self.shared.add(Node::new(Observation::weak(owner), action));
        Cleanable::new(Arc::clone(&self.shared), key)
    }

    /// Hand every weakly observed owner that is gone to the worker.
    ///
    /// Returns how many were found.
    pub fn collect(&self) -> usize {
        self.shared.sweep()
    }

    /// Number of registrations that have not been cleaned yet
    pub fn watched_count(&self) -> usize {
        self.shared.state.lock().list.len()
    }

    pub fn is_worker_running(&self) -> bool {
        self.shared.state.lock().worker_running
    }

    /// Interrupt the worker's wait. An idle worker with nothing pending
    /// stops; otherwise the interrupt is ignored.
    pub fn interrupt(&self) {
        self.shared.interrupt.notify_one();
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.shared.config
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(CleanerConfig::default())
    }
}

impl fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Cleaner")
            .field("watched", &state.list.len())
            .field("worker_running", &state.worker_running)
            .field("idle_timeout", &self.shared.config.idle_timeout)
            .finish()
    }
}
