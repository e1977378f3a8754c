//! # Ember Event System
//!
//! A priority-ordered, type-filtered publish/subscribe bus for embedding
//! inside a larger host runtime (game servers, simulations) as its internal
//! notification mechanism. Subsystems register interest in events without
//! coupling to their publishers, registrations can be added and removed
//! concurrently with in-flight dispatch, and delivery order is
//! deterministic: descending priority, bind order breaking ties.
//!
//! ## Core Features
//!
//! - **Deterministic Ordering**: strictly descending priority with stable
//!   FIFO ties, maintained by the insertion algorithm rather than by
//!   sorting at dispatch time
//! - **Type Filtering**: listeners may subscribe to a single runtime kind
//!   on a heterogeneous `EventBus<dyn Event>` and see only matching events
//! - **Handle Lifecycle**: every bind returns a [`ListenerHandle`] whose
//!   `close` is idempotent under arbitrary add/remove interleavings
//! - **Synchronous Dispatch**: `publish` runs every listener to completion
//!   on the publishing thread; no queues, no deferral
//! - **Re-entrancy**: listeners may bind, remove, clear, and publish on the
//!   bus that is currently dispatching to them
//!
//! ## Quick Start Example
//!
//! ```rust
//! use ember_event_system::{EventBus, Event, PRIORITY_HIGH};
//!
//! #[derive(Debug)]
//! struct BlockPlaced {
//!     column: u32,
//! }
//!
//! #[derive(Debug)]
//! struct ChunkLoaded;
//!
//! // One bus per owning subsystem; `dyn Event` carries mixed kinds.
//! let bus: EventBus<dyn Event> = EventBus::new();
//!
//! // An unfiltered listener sees everything.
//! bus.on().with(PRIORITY_HIGH).bind(|_event: &mut dyn Event| {
//!     Ok(())
//! });
//!
//! // A kind-filtered listener sees only `BlockPlaced`.
//! let handle = bus.on_kind::<BlockPlaced>().bind(|event: &mut BlockPlaced| {
//!     event.column += 1;
//!     Ok(())
//! });
//!
//! let mut event = BlockPlaced { column: 7 };
//! bus.publish(&mut event)?;
//! assert_eq!(event.column, 8);
//!
//! let mut other = ChunkLoaded;
//! bus.publish(&mut other)?;
//!
//! handle.close();
//! # Ok::<(), ember_event_system::DispatchError>(())
//! ```

pub mod bus;
pub mod error;
pub mod events;

// Re-exports for convenience
pub use bus::{
    EventBinder, EventBus, EventBusStats, KindBinder, Listener, ListenerHandle, PRIORITY_DEFAULT,
    PRIORITY_HIGH, PRIORITY_LOW,
};
pub use error::{DispatchError, EventError};
pub use events::{Cancelable, CancelToken, Event};

/// Result type listeners return to the dispatch loop.
pub type ListenerResult = std::result::Result<(), EventError>;
