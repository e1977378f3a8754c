//! Event bus module - ordered registration storage, binders, handles, and
//! the dispatch loop, broken down into manageable components.

mod binder;
mod core;
mod handle;
mod registry;
mod stats;
mod tests;

pub use binder::{EventBinder, KindBinder};
pub use core::EventBus;
pub use handle::ListenerHandle;
pub use registry::Listener;
pub use stats::EventBusStats;

/// Priority for listeners that must observe an event before the default
/// tier.
pub const PRIORITY_HIGH: i32 = 100;
/// Priority assigned when a binder's `with` is omitted.
pub const PRIORITY_DEFAULT: i32 = 0;
/// Priority for listeners that should observe an event after the default
/// tier.
pub const PRIORITY_LOW: i32 = -100;
