//! The fulfillment port and the faults it can raise.

use crate::model::{Order, OrderId};
use async_trait::async_trait;
use thiserror::Error;

/// The action performed for each order once a worker dequeues it.
///
/// Implementations must be safe to retry and bounded in time. The dispatcher
/// never retries a failed fulfillment itself.
#[async_trait]
pub trait FulfillOrder: Send + Sync + 'static {
    async fn fulfill(&self, order: &Order) -> Result<(), FulfillmentError>;
}

/// Errors a fulfillment callback can report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FulfillmentError {
    #[error("Fulfillment failed: {0}")]
    Failed(String),
}

/// A fulfillment that did not finish cleanly, as seen by the dispatcher.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FulfillmentFault {
    #[error("{order_id}: {source}")]
    Failed {
        order_id: OrderId,
        source: FulfillmentError,
    },

    #[error("{order_id}: fulfillment panicked: {message}")]
    Panicked { order_id: OrderId, message: String },
}

impl FulfillmentFault {
    pub fn order_id(&self) -> OrderId {
        match self {
            FulfillmentFault::Failed { order_id, .. } => *order_id,
            FulfillmentFault::Panicked { order_id, .. } => *order_id,
        }
    }
}
