//! # Order Validation
//!
//! [`OrderValidator`] runs the payment pre-authorization and the inventory
//! check concurrently under one shared cancellation scope and folds them into
//! a single [`ValidationVerdict`].
//!
//! ## Aggregation
//!
//! - Both checks are spawned as independent tasks.
//! - The first failure cancels the scope. The sibling drops its outstanding
//!   call at once, so the verdict does not wait for the sibling's own work.
//! - A sibling that had already failed (or run past the shared deadline)
//!   still reports that failure, and the one with the highest
//!   [`ValidationFailure::precedence`] wins. Payment failures beat inventory
//!   failures regardless of which task is joined first.
//! - `Ok(())` is returned only after both checks have passed.

pub mod check;
pub mod error;
pub mod ports;

pub use check::*;
pub use error::*;
pub use ports::*;

use crate::model::Order;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Validates orders against the payment and inventory collaborators.
#[derive(Clone)]
pub struct OrderValidator {
    payment: Arc<dyn PaymentAuthorizer>,
    inventory: Arc<dyn InventoryChecker>,
}

impl OrderValidator {
    pub fn new(payment: Arc<dyn PaymentAuthorizer>, inventory: Arc<dyn InventoryChecker>) -> Self {
        Self { payment, inventory }
    }

    /// Validates `order` with a deadline `budget` from now.
    pub async fn validate_within(&self, order: &Order, budget: Duration) -> ValidationVerdict {
        self.validate(order, Instant::now() + budget).await
    }

    /// Produces exactly one verdict for `order`.
    ///
    /// Both checks run even for an order with no items; its total of zero is
    /// a legitimate amount to pre-authorize.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn validate(&self, order: &Order, deadline: Instant) -> ValidationVerdict {
        let order = Arc::new(order.clone());
        let total = order.total();
        debug!(total, items = order.items.len(), "Validating order");

        let scope = CancellationToken::new();
        let mut checks = JoinSet::new();

        let payment = self.payment.clone();
        let payment_order = order.clone();
        let payment_check = TimedCheck::new(CheckKind::Payment, deadline, scope.clone());
        let payment_task = payment_check.run(async move {
            match payment.pre_authorize(&payment_order.payment, total).await {
                Ok(Authorization::Approved) => Ok(()),
                Ok(Authorization::Declined) => Err(ValidationFailure::PaymentDeclined),
                Err(e) => {
                    warn!(error = %e, "Pre-authorization did not complete");
                    Err(ValidationFailure::PaymentTimeout)
                }
            }
        });
        checks.spawn(payment_task.instrument(tracing::Span::current()));

        let inventory = self.inventory.clone();
        let inventory_order = order.clone();
        let inventory_check = TimedCheck::new(CheckKind::Inventory, deadline, scope.clone());
        let inventory_task = inventory_check.run(async move {
            match inventory.items_in_stock(&inventory_order.items).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(ValidationFailure::ItemOutOfStock),
                Err(e) => {
                    warn!(error = %e, "Inventory lookup did not complete");
                    Err(ValidationFailure::InventoryTimeout)
                }
            }
        });
        checks.spawn(inventory_task.instrument(tracing::Span::current()));

        let mut failures = Vec::new();
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(CheckReport {
                    outcome: CheckOutcome::Failed(failure),
                    ..
                }) => {
                    failures.push(failure);
                    break;
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Check task failed to join"),
            }
        }

        if !failures.is_empty() {
            // Cancelling wakes the sibling; it still reports a failure it already had.
            scope.cancel();
            while let Some(joined) = checks.join_next().await {
                if let Ok(CheckReport {
                    outcome: CheckOutcome::Failed(failure),
                    ..
                }) = joined
                {
                    failures.push(failure);
                }
            }
        }

        let verdict = match failures.into_iter().max_by_key(|f| f.precedence()) {
            Some(failure) => Err(failure),
            None => Ok(()),
        };

        match &verdict {
            Ok(()) => info!("Order accepted"),
            Err(failure) => info!(reason = %failure, "Order rejected"),
        }
        verdict
    }
}
