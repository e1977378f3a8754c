//! Error types for the event system.

use thiserror::Error;

/// Errors a listener can surface while handling a dispatched event.
///
/// Listeners return `Result<(), EventError>`; the bus never interprets the
/// contents beyond logging and aggregation, so hosts are free to fold their
/// own failure modes into [`EventError::Other`].
#[derive(Debug, Error)]
pub enum EventError {
    /// Listener execution failed
    #[error("listener execution failed: {0}")]
    ListenerFailed(String),

    /// Host-defined failure carried through the dispatch pass
    #[error("{0}")]
    Other(String),
}

/// Aggregate dispatch failure returned to the publisher.
///
/// `publish` always completes the dispatch pass before reporting: every live
/// listener is invoked even when an earlier one failed, each failure is
/// logged, and the publisher receives the first failure together with the
/// counts for the whole pass.
#[derive(Debug, Error)]
#[error("{failed} of {invoked} listeners failed during dispatch: {first}")]
pub struct DispatchError {
    /// First failure observed during the pass
    pub first: EventError,
    /// Number of listeners that returned an error
    pub failed: usize,
    /// Number of listeners invoked during the pass
    pub invoked: usize,
}
