use crate::list::Key;
use crate::registry::Shared;
use lazyclean_core::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Caller-side token for one registration.
///
/// It owns neither the owner nor the registration; dropping it changes
/// nothing, and the automatic path still runs if the owner leaks.
#[derive(Clone)]
pub struct Cleanable {
    shared: Arc<Shared>,
    key: Key,
}

impl Cleanable {
    pub(crate) fn new(shared: Arc<Shared>, key: Key) -> Self {
        Self { shared, key }
    }

    #[cfg(test)]
    pub(crate) fn key(&self) -> Key {
        self.key
    }

    /// Run the cleanup action now, with `leak = false`.
    ///
    /// Only the call that wins the removal runs the action; every other call,
    /// and any call after the worker already handled a leak, returns `Ok(())`
    /// without doing anything. The action runs on the calling thread and its
    /// error is returned as [`Error::Action`]. A panicking action unwinds
    /// into the caller.
    pub fn clean(&self) -> Result<()> {
        match self.shared.remove(self.key) {
            Some(node) => node.run(false).map_err(Error::action),
            None => Ok(()),
        }
    }

    /// Whether the registration was already resolved, by either path.
    pub fn is_cleaned(&self) -> bool {
        !self.shared.is_pending(self.key)
    }
}

impl fmt::Debug for Cleanable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanable")
            .field("key", &self.key)
            .field("cleaned", &self.is_cleaned())
            .finish()
    }
}
