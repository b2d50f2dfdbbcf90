use crate::clients::CreateOrderError;
use crate::dispatcher::OrderDispatcher;
use crate::model::{Item, Order, OrderId, PaymentMethod};
use crate::validator::OrderValidator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Entry point a transport layer calls for each create-order request.
///
/// Validation runs first; only accepted orders reach the dispatcher. The
/// transport owns mapping [`CreateOrderError`] onto its own status codes.
#[derive(Clone)]
pub struct OrderClient {
    validator: OrderValidator,
    dispatcher: Arc<OrderDispatcher>,
    deadline: Duration,
    next_id: Arc<AtomicU64>,
}

impl OrderClient {
    pub fn new(validator: OrderValidator, dispatcher: Arc<OrderDispatcher>, deadline: Duration) -> Self {
        Self {
            validator,
            dispatcher,
            deadline,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Hands out a fresh identifier for callers that do not bring their own.
    pub fn next_order_id(&self) -> OrderId {
        OrderId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Builds an order with a generated identifier.
    pub fn new_order(&self, items: Vec<Item>, payment: PaymentMethod) -> Order {
        Order::new(self.next_order_id(), items, payment)
    }

    /// Validates `order` and, if accepted, queues it for fulfillment.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn create_order(&self, order: Order) -> Result<OrderId, CreateOrderError> {
        debug!(?order, "create_order called");

        self.validator
            .validate_within(&order, self.deadline)
            .await?;

        let order_id = order.id;
        self.dispatcher.submit(order).await?;
        info!("Order accepted for fulfillment");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{DispatchError, DispatcherConfig};
    use crate::mock::{RecordingFulfillment, ScriptedInventory, ScriptedPayment};
    use crate::validator::ValidationFailure;

    fn client_with(
        payment: ScriptedPayment,
        inventory: ScriptedInventory,
        fulfillment: Arc<RecordingFulfillment>,
    ) -> (OrderClient, Arc<OrderDispatcher>) {
        let validator = OrderValidator::new(Arc::new(payment), Arc::new(inventory));
        let dispatcher = Arc::new(OrderDispatcher::new(&DispatcherConfig::default(), fulfillment));
        dispatcher.start().unwrap();
        let client = OrderClient::new(validator, dispatcher.clone(), Duration::from_secs(5));
        (client, dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_order_is_fulfilled() {
        let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_millis(10)));
        let (client, dispatcher) = client_with(
            ScriptedPayment::approve_after(Duration::from_millis(30)),
            ScriptedInventory::in_stock_after(Duration::from_millis(20)),
            fulfillment.clone(),
        );

        let order = client.new_order(
            vec![Item::new("Desk", 150.0).unwrap()],
            PaymentMethod::new("tok_visa"),
        );
        let id = client.create_order(order).await.unwrap();
        assert_eq!(id, OrderId(1));

        dispatcher.shutdown().await.unwrap();
        assert_eq!(fulfillment.calls_for(id), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_order_never_reaches_dispatcher() {
        let fulfillment = Arc::new(RecordingFulfillment::new(Duration::ZERO));
        let (client, dispatcher) = client_with(
            ScriptedPayment::decline_after(Duration::from_millis(5)),
            ScriptedInventory::in_stock_after(Duration::from_millis(20)),
            fulfillment.clone(),
        );

        let order = client.new_order(vec![], PaymentMethod::new("tok_declined"));
        let result = client.create_order(order).await;
        assert_eq!(
            result,
            Err(CreateOrderError::Rejected(ValidationFailure::PaymentDeclined))
        );

        let report = dispatcher.shutdown().await.unwrap();
        assert_eq!(report.fulfilled, 0);
        assert_eq!(fulfillment.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_dispatcher_surfaces_dispatch_error() {
        let fulfillment = Arc::new(RecordingFulfillment::new(Duration::ZERO));
        let (client, dispatcher) = client_with(
            ScriptedPayment::approve_after(Duration::ZERO),
            ScriptedInventory::in_stock_after(Duration::ZERO),
            fulfillment,
        );
        dispatcher.shutdown().await.unwrap();

        let order = client.new_order(vec![], PaymentMethod::new("tok_visa"));
        assert_eq!(
            client.create_order(order).await,
            Err(CreateOrderError::Dispatch(DispatchError::DispatcherClosed))
        );
    }

    #[test]
    fn test_generated_ids_are_sequential() {
        let validator = OrderValidator::new(
            Arc::new(ScriptedPayment::approve_after(Duration::ZERO)),
            Arc::new(ScriptedInventory::in_stock_after(Duration::ZERO)),
        );
        let dispatcher = Arc::new(OrderDispatcher::new(
            &DispatcherConfig::default(),
            Arc::new(RecordingFulfillment::new(Duration::ZERO)),
        ));
        let client = OrderClient::new(validator, dispatcher, Duration::from_secs(1));

        assert_eq!(client.next_order_id(), OrderId(1));
        assert_eq!(client.next_order_id(), OrderId(2));
        assert_eq!(client.clone().next_order_id(), OrderId(3));
    }
}
