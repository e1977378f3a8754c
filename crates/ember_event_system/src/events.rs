//! # Event Traits and Capabilities
//!
//! This module defines the capability surface event types need so the bus
//! can filter them at runtime, plus the consumer-side cancellation protocol
//! carried on event types.
//!
//! ## Design Principles
//!
//! - **Type Safety**: subtype filtering is expressed as an [`Any`]-based
//!   capability query, never open-ended reflection
//! - **Zero Ceremony**: every `'static` type is an [`Event`] through the
//!   blanket implementation; no derive or marker is required
//! - **Heterogeneous Buses**: `EventBus<dyn Event>` carries mixed event
//!   kinds through a single bus, with per-listener kind filters

use crate::bus::Listener;
use crate::error::EventError;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Capability trait for event categories that support runtime kind queries.
///
/// A bus declared as `EventBus<dyn Event>` accepts any `'static` event
/// value, and listeners bound through
/// [`on_kind`](crate::bus::EventBus::on_kind) only see events whose runtime
/// type matches their declared kind. Concrete-typed buses (`EventBus<MyEvent>`)
/// get this trait for free as well; a kind filter there matches exactly when
/// the kind is the bus's own event type.
pub trait Event: Any {
    /// Returns this event as `&dyn Any` for runtime kind checks.
    fn as_any(&self) -> &dyn Any;

    /// Returns this event as `&mut dyn Any` so a matching listener can
    /// mutate it through its concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Blanket implementation: any `'static` type can be posted as an event.
impl<T: Any> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Wraps a listener for subtype `E` into a uniform listener for category `T`.
///
/// On invocation the wrapper queries the event's runtime type; events that
/// are an instance of `E` are forwarded to the inner listener, everything
/// else is discarded with `Ok(())`. The bus only ever sees the uniform
/// `Listener<T>` shape, so filtering is invisible outside the wrapper.
pub(crate) fn kind_filter<T, E, F>(inner: F) -> Listener<T>
where
    T: Event + ?Sized,
    E: Any,
    F: Fn(&mut E) -> Result<(), EventError> + Send + Sync + 'static,
{
    std::sync::Arc::new(move |event: &mut T| {
        match event.as_any_mut().downcast_mut::<E>() {
            Some(event) => inner(event),
            None => Ok(()),
        }
    })
}

/// Consumer-side cancellation protocol for event types that support it.
///
/// The bus itself never inspects cancellation; listeners that honor it
/// check [`is_canceled`](Cancelable::is_canceled) before acting, and the
/// publisher reads the final state after `publish` returns.
pub trait Cancelable {
    /// Marks the event as canceled. Irreversible.
    fn cancel(&mut self);

    /// Returns whether a previous listener canceled the event.
    fn is_canceled(&self) -> bool;
}

/// Ready-made cancellation flag for embedding in event structs.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct CancelToken {
    canceled: bool,
}

impl CancelToken {
    /// Creates a token in the not-canceled state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cancelable for CancelToken {
    fn cancel(&mut self) {
        self.canceled = true;
    }

    fn is_canceled(&self) -> bool {
        self.canceled
    }
}
