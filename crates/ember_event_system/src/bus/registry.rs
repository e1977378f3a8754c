//! Ordered registration storage.
//!
//! The registry is an arena of registration slots threaded together as a
//! doubly-linked list through explicit `prev`/`next` indices. Slots freed by
//! removal go onto a free-list and are reused by later binds; every
//! allocation stamps the slot with a registry-wide, monotonically increasing
//! generation so a `(slot, generation)` pair uniquely names one registration
//! for the lifetime of the bus. Handles hold such pairs instead of
//! references, which keeps removal safe under arbitrary add/remove
//! interleavings.

use crate::error::EventError;
use smallvec::SmallVec;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The uniform listener shape stored by the bus.
///
/// Shared as an `Arc` so the same value serves three roles: storage in the
/// registry, identity comparison for [`remove`](super::EventBus::remove),
/// and lock-free invocation during dispatch.
pub type Listener<T> = Arc<dyn Fn(&mut T) -> Result<(), EventError> + Send + Sync>;

/// Snapshot of the live registrations taken at `publish` entry.
pub(crate) type DispatchSnapshot<T> = SmallVec<[SnapshotEntry<T>; 8]>;

/// One snapshot row: enough to re-check liveness right before invocation.
pub(crate) struct SnapshotEntry<T: ?Sized + 'static> {
    pub(crate) slot: usize,
    pub(crate) generation: u64,
    pub(crate) listener: Listener<T>,
}

struct Slot<T: ?Sized + 'static> {
    /// `None` once the registration was removed and the slot freed.
    listener: Option<Listener<T>>,
    priority: i32,
    generation: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

pub(crate) struct Registry<T: ?Sized + 'static> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    live: usize,
    /// Never reset, not even by `clear`; see [`Registry::clear`].
    generations: u64,
}

/// Locks a registry, recovering from poisoning.
///
/// The lock is only ever held across pointer surgery and snapshotting,
/// never across listener callbacks, so a poisoned registry is still
/// structurally consistent.
pub(crate) fn lock<T: ?Sized + 'static>(
    registry: &Mutex<Registry<T>>,
) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: ?Sized + 'static> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            live: 0,
            generations: 0,
        }
    }

    /// Number of live registrations.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// True iff `(slot, generation)` still names a live registration.
    pub(crate) fn is_live(&self, slot: usize, generation: u64) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|s| s.generation == generation && s.listener.is_some())
    }

    fn alloc(&mut self, listener: Listener<T>, priority: i32) -> usize {
        self.generations += 1;
        let slot = Slot {
            listener: Some(listener),
            priority,
            generation: self.generations,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Inserts a registration, keeping the list sorted by descending
    /// priority with FIFO order inside each priority tier.
    ///
    /// The insertion point is found by scanning from the tail toward the
    /// head while the new priority outranks the scanned node. Stopping at
    /// the first node with priority >= the new one places the registration
    /// after every existing peer of equal priority, which is what preserves
    /// bind order as the tie-break.
    pub(crate) fn insert(&mut self, listener: Listener<T>, priority: i32) -> (usize, u64) {
        let index = self.alloc(listener, priority);
        let generation = self.slots[index].generation;

        let mut after = self.tail;
        while let Some(at) = after {
            if priority > self.slots[at].priority {
                after = self.slots[at].prev;
            } else {
                break;
            }
        }

        match after {
            None => {
                // Outranks every existing registration (or the list is
                // empty): becomes the new head.
                self.slots[index].next = self.head;
                match self.head {
                    Some(head) => self.slots[head].prev = Some(index),
                    None => self.tail = Some(index),
                }
                self.head = Some(index);
            }
            Some(at) => {
                let next = self.slots[at].next;
                self.slots[index].prev = Some(at);
                self.slots[index].next = next;
                self.slots[at].next = Some(index);
                match next {
                    Some(next) => self.slots[next].prev = Some(index),
                    None => self.tail = Some(index),
                }
            }
        }

        self.live += 1;
        (index, generation)
    }

    /// Unlinks the registration named by `(slot, generation)`.
    ///
    /// Returns false when the pair no longer names a live registration:
    /// already removed, cleared, or the slot was freed and reused. Removal
    /// through a stale pair must never touch the registration that now
    /// occupies the slot.
    pub(crate) fn unlink(&mut self, slot: usize, generation: u64) -> bool {
        match self.slots.get(slot) {
            Some(s) if s.generation == generation && s.listener.is_some() => {}
            _ => return false,
        }

        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }

        let s = &mut self.slots[slot];
        s.listener = None;
        s.prev = None;
        s.next = None;
        self.free.push(slot);
        self.live -= 1;
        true
    }

    /// Removes the first registration whose stored listener is the same
    /// `Arc` allocation as `listener`. O(n) scan in dispatch order.
    pub(crate) fn remove_listener(&mut self, listener: &Listener<T>) -> bool {
        let mut current = self.head;
        while let Some(index) = current {
            let slot = &self.slots[index];
            if slot
                .listener
                .as_ref()
                .is_some_and(|stored| Arc::ptr_eq(stored, listener))
            {
                let generation = slot.generation;
                return self.unlink(index, generation);
            }
            current = slot.next;
        }
        false
    }

    /// Drops every registration at once.
    ///
    /// The generation counter keeps counting across `clear`, so handles
    /// into the old arena stay permanently dead even though slot indices
    /// restart at zero.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.live = 0;
    }

    /// Collects the live registrations in dispatch order.
    pub(crate) fn snapshot(&self) -> DispatchSnapshot<T> {
        let mut entries = SmallVec::new();
        let mut current = self.head;
        while let Some(index) = current {
            let slot = &self.slots[index];
            if let Some(listener) = &slot.listener {
                entries.push(SnapshotEntry {
                    slot: index,
                    generation: slot.generation,
                    listener: Arc::clone(listener),
                });
            }
            current = slot.next;
        }
        entries
    }

    /// Priorities in dispatch order; test-only view of the list structure.
    #[cfg(test)]
    fn priorities(&self) -> Vec<i32> {
        let mut out = Vec::new();
        let mut current = self.head;
        while let Some(index) = current {
            out.push(self.slots[index].priority);
            current = self.slots[index].next;
        }
        out
    }
}
