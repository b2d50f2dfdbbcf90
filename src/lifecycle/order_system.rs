use crate::clients::OrderClient;
use crate::dispatcher::{DispatchError, DrainReport, FulfillOrder, FulfillmentFault, OrderDispatcher};
use crate::lifecycle::IntakeConfig;
use crate::validator::{InventoryChecker, OrderValidator, PaymentAuthorizer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// The process-level wiring of the order-intake core.
///
/// `OrderSystem` is constructed once at startup and owns every component;
/// nothing lives in a global. Transports receive a clone of
/// [`OrderSystem::order_client`].
///
/// # Example
///
/// ```ignore
/// let system = OrderSystem::new(&config, payment, inventory, fulfillment)?;
///
/// let order = system.order_client.new_order(items, payment_method);
/// let order_id = system.order_client.create_order(order).await?;
///
/// // Stop transports first, then drain
/// let report = system.shutdown().await?;
/// ```
pub struct OrderSystem {
    /// Inbound entry point (validate, then dispatch).
    pub order_client: OrderClient,

    dispatcher: Arc<OrderDispatcher>,
}

impl OrderSystem {
    /// Builds the validator, dispatcher and client, and starts the dispatcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: &IntakeConfig,
        payment: Arc<dyn PaymentAuthorizer>,
        inventory: Arc<dyn InventoryChecker>,
        fulfillment: Arc<dyn FulfillOrder>,
    ) -> Result<Self, DispatchError> {
        let validator = OrderValidator::new(payment, inventory);
        let dispatcher = Arc::new(OrderDispatcher::new(&config.dispatcher, fulfillment));
        dispatcher.start()?;

        let order_client = OrderClient::new(
            validator,
            dispatcher.clone(),
            config.validation.deadline(),
        );

        info!(
            queue_capacity = config.dispatcher.queue_capacity,
            max_concurrency = config.dispatcher.max_concurrency,
            overflow = ?config.dispatcher.overflow,
            deadline_ms = config.validation.deadline_ms,
            "Order system started"
        );

        Ok(Self {
            order_client,
            dispatcher,
        })
    }

    pub fn dispatcher(&self) -> &OrderDispatcher {
        &self.dispatcher
    }

    /// Fulfillment faults reported by the dispatcher. Only the first call gets
    /// the receiver.
    pub fn take_faults(&self) -> Option<mpsc::Receiver<FulfillmentFault>> {
        self.dispatcher.take_faults()
    }

    /// Gracefully shuts down the system.
    ///
    /// The client is dropped first so no new orders come in through it, then
    /// the dispatcher drains everything already queued or in flight.
    /// Clones of the client held elsewhere must be quiesced by their owners
    /// beforehand; late submissions get [`DispatchError::DispatcherClosed`].
    pub async fn shutdown(self) -> Result<DrainReport, DispatchError> {
        info!("Shutting down order system...");
        drop(self.order_client);

        let report = self.dispatcher.shutdown().await?;
        info!(
            fulfilled = report.fulfilled,
            failed = report.failed,
            "Order system shutdown complete."
        );
        Ok(report)
    }
}
