//! Outbound check interfaces.
//!
//! The validator is agnostic to how these are implemented (network call,
//! in-memory simulation, test double). Cancellation is delivered by dropping
//! the returned future, so implementations must not hold resources that
//! outlive it.

use crate::model::{Item, PaymentMethod};
use crate::validator::CheckError;
use async_trait::async_trait;

/// Answer of a payment pre-authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Approved,
    Declined,
}

/// Checks that a payment method can cover an amount without charging it.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync + 'static {
    async fn pre_authorize(
        &self,
        payment: &PaymentMethod,
        amount: f64,
    ) -> Result<Authorization, CheckError>;
}

/// Checks whether every item of an order is in stock.
#[async_trait]
pub trait InventoryChecker: Send + Sync + 'static {
    /// Returns `Ok(true)` only if all items are available.
    async fn items_in_stock(&self, items: &[Item]) -> Result<bool, CheckError>;
}
