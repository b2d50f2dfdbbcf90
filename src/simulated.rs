//! In-process stand-ins for the external collaborators.
//!
//! They model the costly calls with a sleep, which makes them useful for the
//! demo binary and for exercising timeouts. A real deployment swaps in network
//! clients implementing the same traits.

use crate::dispatcher::{FulfillOrder, FulfillmentError};
use crate::model::{Item, Order, PaymentMethod};
use crate::validator::{Authorization, CheckError, InventoryChecker, PaymentAuthorizer};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Approves every payment method except the blocked tokens.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentGateway {
    latency: Duration,
    blocked_tokens: HashSet<String>,
}

impl SimulatedPaymentGateway {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            blocked_tokens: HashSet::new(),
        }
    }

    pub fn blocking(mut self, token: impl Into<String>) -> Self {
        self.blocked_tokens.insert(token.into());
        self
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl PaymentAuthorizer for SimulatedPaymentGateway {
    async fn pre_authorize(
        &self,
        payment: &PaymentMethod,
        amount: f64,
    ) -> Result<Authorization, CheckError> {
        debug!(amount, "Pre-authorizing");
        tokio::time::sleep(self.latency).await;
        if self.blocked_tokens.contains(payment.token()) {
            return Ok(Authorization::Declined);
        }
        Ok(Authorization::Approved)
    }
}

/// Reports everything in stock except the listed item descriptions.
#[derive(Debug, Clone)]
pub struct SimulatedInventory {
    latency: Duration,
    sold_out: HashSet<String>,
}

impl SimulatedInventory {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            sold_out: HashSet::new(),
        }
    }

    pub fn sold_out(mut self, description: impl Into<String>) -> Self {
        self.sold_out.insert(description.into());
        self
    }
}

impl Default for SimulatedInventory {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl InventoryChecker for SimulatedInventory {
    async fn items_in_stock(&self, items: &[Item]) -> Result<bool, CheckError> {
        tokio::time::sleep(self.latency).await;
        Ok(items
            .iter()
            .all(|item| !self.sold_out.contains(&item.description)))
    }
}

/// Stand-in fulfillment: waits, then logs the order as shipped.
#[derive(Debug, Clone)]
pub struct LoggingFulfillment {
    latency: Duration,
}

impl LoggingFulfillment {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for LoggingFulfillment {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl FulfillOrder for LoggingFulfillment {
    async fn fulfill(&self, order: &Order) -> Result<(), FulfillmentError> {
        tokio::time::sleep(self.latency).await;
        info!(order_id = %order.id, total = order.total(), "Order fulfilled");
        Ok(())
    }
}
