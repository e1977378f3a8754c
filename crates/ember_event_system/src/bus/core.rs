//! Core `EventBus` implementation.

use super::binder::{EventBinder, KindBinder};
use super::handle::ListenerHandle;
use super::registry::{lock, Listener, Registry};
use super::stats::EventBusStats;
use crate::error::{DispatchError, EventError};
use crate::events::Event;
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, trace};

/// A priority-ordered, type-filtered publish/subscribe bus for one event
/// category `T`.
///
/// The bus is thread-safe: listeners can be bound and removed concurrently
/// with in-flight `publish` calls, no external locking needed. Dispatch is
/// synchronous and inline: every listener runs to completion on the
/// publishing thread, in strictly descending priority order with bind order
/// breaking ties.
///
/// Each bus is exclusively owned by the subsystem that created it; pass
/// references to collaborators explicitly rather than through ambient
/// lookup.
///
/// # Concurrency contract
///
/// `publish` snapshots the live registrations at entry and releases the
/// internal lock before invoking each listener, so a listener is free to
/// bind, remove, clear, or publish on the same bus without deadlocking. A
/// registration bound during an in-flight `publish` is never visited by
/// that call; a registration removed during an in-flight `publish` is not
/// invoked once its removal is observed, though it may already have run.
pub struct EventBus<T: ?Sized + 'static> {
    registry: Arc<Mutex<Registry<T>>>,
    stats: Mutex<EventBusStats>,
}

impl<T: ?Sized + 'static> EventBus<T> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
            stats: Mutex::new(EventBusStats::default()),
        }
    }

    /// Begins an unfiltered subscription: the bound listener sees every
    /// event published on this bus.
    pub fn on(&self) -> EventBinder<'_, T> {
        EventBinder::new(self)
    }

    /// Begins a subscription filtered to runtime subtype `E`.
    ///
    /// The eventual listener is invoked only for events whose runtime type
    /// is an instance of `E`; other events are discarded before the
    /// listener is reached.
    pub fn on_kind<E: Any>(&self) -> KindBinder<'_, T, E>
    where
        T: Event,
    {
        KindBinder::new(self)
    }

    /// Inserts a registration; shared tail of both binder paths.
    pub(super) fn bind_listener(&self, listener: Listener<T>, priority: i32) -> ListenerHandle<T> {
        let (slot, generation) = lock(&self.registry).insert(Arc::clone(&listener), priority);
        self.stats_mut().listeners_bound += 1;
        debug!(slot, priority, "listener bound");
        ListenerHandle::new(Arc::downgrade(&self.registry), slot, generation, listener)
    }

    /// Removes a registration by listener identity.
    ///
    /// Scans the sequence in dispatch order and unlinks the first
    /// registration whose stored listener is the same allocation as
    /// `listener` (see [`ListenerHandle::listener`]). Returns whether a
    /// match was found. O(n); callers holding a handle should prefer
    /// [`ListenerHandle::close`].
    pub fn remove(&self, listener: &Listener<T>) -> bool {
        let removed = lock(&self.registry).remove_listener(listener);
        if removed {
            debug!("listener unregistered by identity");
        }
        removed
    }

    /// True iff the bus currently has zero live registrations.
    pub fn is_empty(&self) -> bool {
        lock(&self.registry).is_empty()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Atomically drops all registrations.
    ///
    /// Handles held afterward are already-removed; their `close` stays an
    /// idempotent no-op.
    pub fn clear(&self) {
        let dropped = {
            let mut registry = lock(&self.registry);
            let dropped = registry.len();
            registry.clear();
            dropped
        };
        debug!(dropped, "bus cleared");
    }

    /// Publishes an event to every live listener, in priority order.
    ///
    /// The live registrations are snapshotted at entry; each one is
    /// re-checked immediately before invocation and skipped if it was
    /// removed in the meantime. Listener callbacks run with no internal
    /// lock held.
    ///
    /// # Errors
    ///
    /// A failing listener never stops the pass: every remaining live
    /// listener still runs, each failure is logged, and afterwards the
    /// first failure is returned as part of a [`DispatchError`] carrying
    /// the failed/invoked counts for the whole pass.
    pub fn publish(&self, event: &mut T) -> Result<(), DispatchError> {
        let entries = lock(&self.registry).snapshot();
        trace!(listeners = entries.len(), "dispatching event");

        let mut invoked = 0usize;
        let mut failed = 0usize;
        let mut first: Option<EventError> = None;

        for entry in entries {
            // Skip registrations removed since the snapshot was taken.
            if !lock(&self.registry).is_live(entry.slot, entry.generation) {
                continue;
            }
            invoked += 1;
            if let Err(err) = (entry.listener)(&mut *event) {
                error!(slot = entry.slot, %err, "listener failed during dispatch");
                failed += 1;
                if first.is_none() {
                    first = Some(err);
                }
            }
        }

        {
            let mut stats = self.stats_mut();
            stats.events_published += 1;
            stats.listeners_invoked += invoked as u64;
            stats.dispatch_failures += failed as u64;
        }

        match first {
            None => Ok(()),
            Some(first) => Err(DispatchError {
                first,
                failed,
                invoked,
            }),
        }
    }

    /// Current counter values for this bus.
    pub fn stats(&self) -> EventBusStats {
        self.stats_mut().clone()
    }

    fn stats_mut(&self) -> std::sync::MutexGuard<'_, EventBusStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &lock(&self.registry).len())
            .finish()
    }
}
