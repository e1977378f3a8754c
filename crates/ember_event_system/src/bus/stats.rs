/// Statistics tracking for the event bus
use serde::{Deserialize, Serialize};

/// Counters for monitoring one bus instance.
///
/// Purely observational; nothing in the dispatch path depends on these.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Registrations created since the bus was built
    pub listeners_bound: u64,
    /// Events published since the bus was built
    pub events_published: u64,
    /// Listener invocations across all dispatch passes
    pub listeners_invoked: u64,
    /// Listener invocations that returned an error
    pub dispatch_failures: u64,
}
