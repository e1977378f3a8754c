//! Registration handles.

use super::registry::{lock, Listener, Registry};
use std::sync::{Mutex, Weak};
use tracing::debug;

/// Caller-held permission to remove one specific registration.
///
/// A handle is the lightweight value `(registry, slot, generation)` plus a
/// clone of the bound listener for identity queries. It never keeps the
/// registration alive on its own, and dropping it does **not** unsubscribe:
/// releasing a subscription is always the explicit [`close`](Self::close)
/// call. A registration with no surviving handle simply stays bound until
/// the bus is cleared or dropped.
pub struct ListenerHandle<T: ?Sized + 'static> {
    registry: Weak<Mutex<Registry<T>>>,
    slot: usize,
    generation: u64,
    listener: Listener<T>,
}

impl<T: ?Sized + 'static> ListenerHandle<T> {
    pub(crate) fn new(
        registry: Weak<Mutex<Registry<T>>>,
        slot: usize,
        generation: u64,
        listener: Listener<T>,
    ) -> Self {
        Self {
            registry,
            slot,
            generation,
            listener,
        }
    }

    /// Removes the underlying registration from its bus.
    ///
    /// Idempotent: calling `close` more than once, after the bus was
    /// cleared, or after the bus itself was dropped is a silent no-op.
    pub fn close(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if lock(&registry).unlink(self.slot, self.generation) {
            debug!(slot = self.slot, "listener unregistered via handle");
        }
    }

    /// The listener stored at bind time.
    ///
    /// For a kind-filtered bind this is the wrapping listener, not the inner
    /// callback; it is the value [`remove`](super::EventBus::remove)
    /// compares against.
    pub fn listener(&self) -> &Listener<T> {
        &self.listener
    }

    /// Whether the underlying registration is still live.
    pub fn is_live(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| lock(&registry).is_live(self.slot, self.generation))
    }
}

impl<T: ?Sized + 'static> std::fmt::Debug for ListenerHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}
