//! Fluent subscription binders.
//!
//! A binder is the single canonical path to a registration: select the
//! optional kind filter with [`EventBus::on`](super::EventBus::on) or
//! [`EventBus::on_kind`](super::EventBus::on_kind), optionally set a
//! priority, then bind the callback. Priority and filter are fixed at bind
//! time; changing either means closing the handle and binding again.

use super::core::EventBus;
use super::handle::ListenerHandle;
use crate::error::EventError;
use crate::events::{kind_filter, Event};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Binder for an unfiltered subscription: the listener sees every event
/// published on the bus.
#[must_use = "a binder does nothing until bind() is called"]
pub struct EventBinder<'bus, T: ?Sized + 'static> {
    bus: &'bus EventBus<T>,
    priority: i32,
}

impl<'bus, T: ?Sized + 'static> EventBinder<'bus, T> {
    pub(crate) fn new(bus: &'bus EventBus<T>) -> Self {
        Self {
            bus,
            priority: super::PRIORITY_DEFAULT,
        }
    }

    /// Sets the dispatch priority for the eventual registration.
    ///
    /// Higher values dispatch earlier; defaults to
    /// [`PRIORITY_DEFAULT`](super::PRIORITY_DEFAULT) when omitted.
    pub fn with(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Creates the registration and returns its handle.
    pub fn bind<F>(self, listener: F) -> ListenerHandle<T>
    where
        F: Fn(&mut T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus.bind_listener(Arc::new(listener), self.priority)
    }
}

/// Binder for a subscription filtered to runtime subtype `E`.
///
/// The bound callback only sees events whose runtime type is an instance of
/// `E`; everything else is discarded inside the wrapper produced at bind
/// time. Binding a kind unrelated to what publishers actually post is not
/// an error; the listener simply never fires.
#[must_use = "a binder does nothing until bind() is called"]
pub struct KindBinder<'bus, T: ?Sized + 'static, E> {
    bus: &'bus EventBus<T>,
    priority: i32,
    kind: PhantomData<fn(E)>,
}

impl<'bus, T, E> KindBinder<'bus, T, E>
where
    T: Event + ?Sized,
    E: Any,
{
    pub(crate) fn new(bus: &'bus EventBus<T>) -> Self {
        Self {
            bus,
            priority: super::PRIORITY_DEFAULT,
            kind: PhantomData,
        }
    }

    /// Sets the dispatch priority for the eventual registration.
    pub fn with(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Creates the registration, wrapping `listener` in the kind filter,
    /// and returns its handle.
    pub fn bind<F>(self, listener: F) -> ListenerHandle<T>
    where
        F: Fn(&mut E) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.bus
            .bind_listener(kind_filter::<T, E, F>(listener), self.priority)
    }
}

impl<T: ?Sized + 'static> std::fmt::Debug for EventBinder<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinder")
            .field("priority", &self.priority)
            .finish()
    }
}

impl<T: ?Sized + 'static, E> std::fmt::Debug for KindBinder<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindBinder")
            .field("priority", &self.priority)
            .field("kind", &std::any::type_name::<E>())
            .finish()
    }
}
