//! Arena-backed doubly linked list of pending registrations.
//!
//! Nodes live in slots addressed by index, so splicing in and out is O(1)
//! without any pointer juggling. A removed slot has both links pointing at
//! itself; that sentinel is checked before any mutation, which makes removal
//! idempotent. Slots are recycled through a free list and every reuse bumps
//! the slot generation, so a [`Key`] handed out for an earlier occupant can
//! never reach the new one.

const NIL: usize = usize::MAX;

/// Stable address of a node in a [`NodeList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Slot<T> {
    prev: usize,
    next: usize,
    generation: u64,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn is_unlinked(&self, index: usize) -> bool {
        self.prev == index && self.next == index
    }
}

#[derive(Debug)]
pub(crate) struct NodeList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: usize,
    len: usize,
}

impl<T> NodeList<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            len: 0,
        }
    }

    /// Number of linked nodes
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Link `value` in front of the current head.
    pub(crate) fn push_front(&mut self, value: T) -> Key {
        let old_head = self.head;

        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.prev = NIL;
                slot.next = old_head;
                slot.value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    prev: NIL,
                    next: old_head,
                    generation: 0,
                    value: Some(value),
                });
                self.slots.len() - 1
            }
        };

        if old_head != NIL {
            self.slots[old_head].prev = index;
        }
        self.head = index;
        self.len += 1;

        Key {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Whether `key` still addresses a linked node.
    pub(crate) fn contains(&self, key: Key) -> bool {
        self.slots.get(key.index).is_some_and(|slot| {
            slot.generation == key.generation && !slot.is_unlinked(key.index)
        })
    }

    /// Unlink the node at `key` and hand back its value.
    ///
    /// Returns `None` when the node was already removed, whoever removed it.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        if !self.contains(key) {
            return None;
        }

        let (prev, next) = {
            let slot = &self.slots[key.index];
            (slot.prev, slot.next)
        };

        if self.head == key.index {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        }
        if prev != NIL {
            self.slots[prev].next = next;
        }

        let slot = &mut self.slots[key.index];
        slot.prev = key.index;
        slot.next = key.index;
        let value = slot.value.take();

        self.free.push(key.index);
        self.len -= 1;
        value
    }

    /// Visit linked nodes from head to tail.
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(Key, &mut T)) {
        let mut cursor = self.head;
        while cursor != NIL {
            let slot = &mut self.slots[cursor];
            let next = slot.next;
            if let Some(value) = slot.value.as_mut() {
                f(
                    Key {
                        index: cursor,
                        generation: slot.generation,
                    },
                    value,
                );
            }
            cursor = next;
        }
    }
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values(list: &mut NodeList<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        list.for_each_mut(|_, value| out.push(*value));
        out
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let mut list = NodeList::new();
        list.push_front(1);
        list.push_front(2);
        list.push_front(3);

        assert_eq!(values(&mut list), vec![3, 2, 1]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut list = NodeList::new();
        let a = list.push_front(1);
        let b = list.push_front(2);
        let c = list.push_front(3);
        let d = list.push_front(4);

        assert_eq!(list.remove(d), Some(4));
        assert_eq!(values(&mut list), vec![3, 2, 1]);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(values(&mut list), vec![3, 1]);

        assert_eq!(list.remove(a), Some(1));
        assert_eq!(values(&mut list), vec![3]);

        assert_eq!(list.remove(c), Some(3));
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut list = NodeList::new();
        let key = list.push_front(7);
        list.push_front(8);

        assert_eq!(list.remove(key), Some(7));
        assert_eq!(list.remove(key), None);
        assert_eq!(list.remove(key), None);
        assert_eq!(values(&mut list), vec![8]);
    }

    #[test]
    fn test_stale_key_does_not_reach_new_occupant() {
        let mut list = NodeList::new();
        let old = list.push_front(1);
        assert_eq!(list.remove(old), Some(1));

        let new = list.push_front(2);
        assert_ne!(old, new);
        assert!(!list.contains(old));
        assert_eq!(list.remove(old), None);
        assert_eq!(list.remove(new), Some(2));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u32),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u32>().prop_map(Op::Push),
            (0usize..64).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn test_list_matches_model(ops in prop::collection::vec(op(), 1..200)) {
            let mut list = NodeList::new();
            let mut issued: Vec<Key> = Vec::new();
            // newest first, like the list itself
            let mut model: Vec<(Key, u32)> = Vec::new();

            for op in ops {
                match op {
                    Op::Push(value) => {
                        let key = list.push_front(value);
                        issued.push(key);
                        model.insert(0, (key, value));
                    }
                    Op::Remove(pick) => {
                        if issued.is_empty() {
                            continue;
                        }
                        let key = issued[pick % issued.len()];
                        let expected = model
                            .iter()
                            .position(|(k, _)| *k == key)
                            .map(|pos| model.remove(pos).1);
                        prop_assert_eq!(list.remove(key), expected);
                    }
                }

                let expected: Vec<u32> = model.iter().map(|(_, v)| *v).collect();
                prop_assert_eq!(values(&mut list), expected);
                prop_assert_eq!(list.len(), model.len());
                prop_assert_eq!(list.is_empty(), model.is_empty());
            }
        }
    }
}
