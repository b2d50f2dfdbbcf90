//! Error types for the Order dispatcher.

use thiserror::Error;

/// Usage errors and backpressure signals returned by the dispatcher.
///
/// The caller decides whether to retry, shed, or propagate them.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The intake queue is at capacity and the overflow policy is `Reject`.
    #[error("Order queue is full")]
    QueueFull,

    /// Shutdown has begun; no further orders are accepted.
    #[error("Dispatcher is closed")]
    DispatcherClosed,

    /// `start` was called more than once.
    #[error("Dispatcher already started")]
    AlreadyStarted,
}
