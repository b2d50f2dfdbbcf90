//! Error types for the order intake path.

use crate::dispatcher::DispatchError;
use crate::validator::ValidationFailure;
use thiserror::Error;

/// Why an incoming order was not accepted for fulfillment.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CreateOrderError {
    /// The order failed validation; surfaced to the customer as-is.
    #[error("Order rejected: {0}")]
    Rejected(#[from] ValidationFailure),

    /// The order was valid but the dispatcher would not take it.
    #[error("Order not dispatched: {0}")]
    Dispatch(#[from] DispatchError),
}
