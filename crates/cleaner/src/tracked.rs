use crate::list::Key;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::UnboundedSender;

/// Reference-counted owner whose reachability a [`Cleaner`](crate::Cleaner)
/// can observe.
///
/// Clones share one allocation. When the last clone is dropped, every
/// registration still pending against it is handed to its cleaner's worker,
/// which runs the action with `leak = true`. The registry itself never holds
/// a clone.
pub struct Tracked<T> {
    inner: Arc<TrackedInner<T>>,
}

struct TrackedInner<T> {
    value: T,
    watchers: Arc<Watchers>,
}

/// Pending registrations of one owner, keyed so a cleaned registration can
/// take itself out again.
#[derive(Default)]
pub(crate) struct Watchers {
    entries: Mutex<HashMap<Key, UnboundedSender<Key>>>,
}

impl Watchers {
    pub(crate) fn unwatch(&self, key: Key) {
        self.entries.lock().remove(&key);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<T> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(TrackedInner {
                value,
                watchers: Arc::new(Watchers::default()),
            }),
        }
    }

    /// Number of live clones
    pub fn strong_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    /// Registrations that will be reported when the last clone drops
    pub fn pending_watches(this: &Self) -> usize {
        this.inner.watchers.len()
    }

    /// Non-owning link to the watcher set, kept by the registration node.
    pub(crate) fn watchers(&self) -> Weak<Watchers> {
        Arc::downgrade(&self.inner.watchers)
    }

    pub(crate) fn watch(&self, queue: UnboundedSender<Key>, key: Key) {
        self.inner.watchers.entries.lock().insert(key, queue);
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.inner.value)
            .field("watchers", &self.inner.watchers.len())
            .finish()
    }
}

impl<T> Drop for TrackedInner<T> {
    fn drop(&mut self) {
        for (key, queue) in self.watchers.entries.lock().drain() {
            // A closed queue means the cleaner is gone along with its work.
            let _ = queue.send(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::NodeList;
    use std::collections::HashSet;
    use tokio::sync::mpsc;

    #[test]
    fn test_last_drop_reports_every_watch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut list = NodeList::new();
        let first = list.push_front(());
        let second = list.push_front(());

        let owner = Tracked::new("connection");
        owner.watch(tx.clone(), first);
        owner.watch(tx, second);

        let clone = owner.clone();
        assert_eq!(Tracked::strong_count(&owner), 2);
        assert_eq!(Tracked::pending_watches(&owner), 2);
        assert_eq!(*clone, "connection");

        drop(owner);
        assert!(rx.try_recv().is_err());

        drop(clone);
        let reported: HashSet<Key> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(reported, HashSet::from([first, second]));
    }

    #[test]
    fn test_unwatched_key_is_not_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut list = NodeList::new();
        let kept = list.push_front(());
        let cleaned = list.push_front(());

        let owner = Tracked::new(());
        owner.watch(tx.clone(), kept);
        owner.watch(tx, cleaned);

        if let Some(watchers) = owner.watchers().upgrade() {
            watchers.unwatch(cleaned);
        }
        assert_eq!(Tracked::pending_watches(&owner), 1);

        drop(owner);
        assert_eq!(rx.try_recv().ok(), Some(kept));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_watchers_link_does_not_outlive_owner() {
        let owner = Tracked::new(3u16);
        let watchers = owner.watchers();
        assert!(watchers.upgrade().is_some());

        drop(owner);
        assert!(watchers.upgrade().is_none());
    }

    #[test]
    fn test_drop_after_cleaner_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let key = NodeList::new().push_front(());

        let owner = Tracked::new(1u8);
        owner.watch(tx, key);
        drop(rx);

        // Must not panic.
        drop(owner);
    }
}
