use crate::list::Key;
use crate::tracked::{Tracked, Watchers};
use lazyclean_core::BoxError;
use std::fmt;
use std::sync::{Arc, Weak};

/// Work to run exactly once when a registration is resolved.
///
/// `leak` is `false` when the caller asked for the cleanup through
/// [`Cleanable::clean`](crate::Cleanable::clean) and `true` when the owner
/// became unreachable first.
pub trait CleaningAction: Send + 'static {
    fn on_clean(self: Box<Self>, leak: bool) -> Result<(), BoxError>;
}

impl<F, E> CleaningAction for F
where
    F: FnOnce(bool) -> Result<(), E> + Send + 'static,
    E: Into<BoxError>,
{
    fn on_clean(self: Box<Self>, leak: bool) -> Result<(), BoxError> {
        (*self)(leak).map_err(Into::into)
    }
}

/// How the registry learns that an owner is gone.
pub(crate) enum Observation {
    /// The owner is a [`Tracked`] and enqueues itself on its last drop.
    Tracked { watchers: Weak<Watchers> },
    /// Plain `Arc` owner, found by sweeping.
    Weak {
        alive: Box<dyn Fn() -> bool + Send>,
        enqueued: bool,
    },
}

impl Observation {
    pub(crate) fn tracked<T>(owner: &Tracked<T>) -> Self {
        Self::Tracked {
            watchers: owner.watchers(),
        }
    }

    pub(crate) fn weak<T>(owner: &Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(owner);
        Self::Weak {
            alive: Box::new(move || weak.strong_count() > 0),
            enqueued: false,
        }
    }

    /// Returns true exactly once, the first time the owner is seen gone.
    pub(crate) fn poll_unreachable(&mut self) -> bool {
        match self {
            Self::Tracked { .. } => false,
            Self::Weak { alive, enqueued } => {
                if *enqueued || alive() {
                    return false;
                }
                *enqueued = true;
                true
            }
        }
    }

    pub(crate) fn is_weak(&self) -> bool {
        matches!(self, Self::Weak { .. })
    }

    /// Detach a resolved registration from its owner, if the owner is still
    /// around to report it.
    pub(crate) fn unwatch(&self, key: Key) {
        if let Self::Tracked { watchers } = self {
            if let Some(watchers) = watchers.upgrade() {
                watchers.unwatch(key);
            }
        }
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tracked { .. } => f.write_str("Tracked"),
            Self::Weak { enqueued, .. } => f
                .debug_struct("Weak")
                .field("enqueued", enqueued)
                .finish_non_exhaustive(),
        }
    }
}

/// One pending registration.
pub(crate) struct Node {
    pub(crate) observation: Observation,
    action: Box<dyn CleaningAction>,
}

impl Node {
    pub(crate) fn new(observation: Observation, action: impl CleaningAction) -> Self {
        Self {
            observation,
            action: Box::new(action),
        }
    }

    pub(crate) fn run(self, leak: bool) -> Result<(), BoxError> {
        self.action.on_clean(leak)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("observation", &self.observation)
            .finish_non_exhaustive()
    }
}
