//! Error types for order validation.

use thiserror::Error;

/// The reasons an order can fail validation.
///
/// These are expected, user-visible outcomes and are surfaced verbatim to the
/// caller of [`OrderValidator::validate`](crate::validator::OrderValidator::validate).
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The payment pre-authorization did not complete before the deadline.
    #[error("pre-authorization request timeout")]
    PaymentTimeout,

    /// The payment method cannot cover the order total.
    #[error("payment method declined")]
    PaymentDeclined,

    /// The inventory lookup did not complete before the deadline.
    #[error("check inventory request timeout")]
    InventoryTimeout,

    /// At least one item in the order is unavailable.
    #[error("sorry, one or more items in your order is out of stock")]
    ItemOutOfStock,
}

impl ValidationFailure {
    /// Rank used to pick a single failure when several are observed together.
    ///
    /// Payment failures outrank inventory failures, and a definite answer
    /// outranks a timeout from the same check.
    pub fn precedence(self) -> u8 {
        match self {
            ValidationFailure::PaymentDeclined => 3,
            ValidationFailure::PaymentTimeout => 2,
            ValidationFailure::ItemOutOfStock => 1,
            ValidationFailure::InventoryTimeout => 0,
        }
    }
}

/// The single verdict produced by one validation call.
pub type ValidationVerdict = Result<(), ValidationFailure>;

/// Errors reported by an outbound check collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckError {
    /// The collaborator could not be reached or did not answer.
    #[error("Check backend unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with something unusable.
    #[error("Check backend error: {0}")]
    Backend(String),
}
