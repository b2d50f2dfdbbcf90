use order_intake::dispatcher::{
    DispatchError, DispatcherConfig, DispatcherState, FulfillmentFault, OrderDispatcher,
    OverflowPolicy,
};
use order_intake::mock::RecordingFulfillment;
use order_intake::model::{Order, OrderId, PaymentMethod};
use std::sync::Arc;
use std::time::Duration;

fn order(id: u64) -> Order {
    Order::new(id, vec![], PaymentMethod::new("tok_test"))
}

fn config(queue_capacity: usize, max_concurrency: usize, overflow: OverflowPolicy) -> DispatcherConfig {
    DispatcherConfig {
        queue_capacity,
        max_concurrency,
        overflow,
    }
}

/// Ceiling 3, capacity 100, six orders: every callback runs exactly once and
/// never more than three at a time.
#[tokio::test(start_paused = true)]
async fn test_six_orders_with_ceiling_of_three() {
    let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_millis(50)));
    let dispatcher = OrderDispatcher::new(
        &config(100, 3, OverflowPolicy::Reject),
        fulfillment.clone(),
    );
    dispatcher.start().unwrap();

    for id in 1..=6 {
        dispatcher.submit(order(id)).await.unwrap();
    }
    let report = dispatcher.shutdown().await.unwrap();

    assert_eq!(report.fulfilled, 6);
    assert_eq!(report.failed, 0);
    for id in 1..=6 {
        assert_eq!(fulfillment.calls_for(OrderId(id)), 1, "order {id}");
    }
    assert_eq!(fulfillment.max_concurrent(), 3);
}

/// Many producers on a multi-threaded runtime never push the pool past its
/// ceiling.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ceiling_holds_under_concurrent_submission() {
    const CEILING: usize = 4;
    const ORDERS: u64 = 200;

    let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_millis(2)));
    let dispatcher = Arc::new(OrderDispatcher::new(
        &config(16, CEILING, OverflowPolicy::Wait),
        fulfillment.clone(),
    ));
    dispatcher.start().unwrap();

    let mut producers = Vec::new();
    for chunk in 0..8u64 {
        let dispatcher = dispatcher.clone();
        producers.push(tokio::spawn(async move {
            for n in 0..ORDERS / 8 {
                dispatcher.submit(order(chunk * 1000 + n)).await.unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let report = dispatcher.shutdown().await.unwrap();
    assert_eq!(report.fulfilled, ORDERS as usize);
    assert_eq!(fulfillment.total_calls(), ORDERS as usize);
    assert!(fulfillment.max_concurrent() <= CEILING);
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_orders_start_in_submission_order() {
    let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_millis(5)));
    let dispatcher = OrderDispatcher::new(
        &config(10, 1, OverflowPolicy::Reject),
        fulfillment.clone(),
    );

    for id in 1..=5 {
        dispatcher.submit(order(id)).await.unwrap();
    }
    dispatcher.start().unwrap();
    dispatcher.shutdown().await.unwrap();

    let expected: Vec<OrderId> = (1..=5).map(OrderId).collect();
    assert_eq!(fulfillment.started_order(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_queued_and_in_flight() {
    let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_secs(1)));
    let dispatcher = OrderDispatcher::new(
        &config(10, 2, OverflowPolicy::Reject),
        fulfillment.clone(),
    );
    dispatcher.start().unwrap();

    for id in 1..=5 {
        dispatcher.submit(order(id)).await.unwrap();
    }
    // Let the first two get going so shutdown sees both in-flight and queued work.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(dispatcher.in_flight(), 2);

    let report = dispatcher.shutdown().await.unwrap();
    assert_eq!(report.fulfilled, 5);
    assert_eq!(fulfillment.completed(), 5);
    assert_eq!(fulfillment.active(), 0);

    // Nothing runs after shutdown returns.
    let calls = fulfillment.total_calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fulfillment.total_calls(), calls);
    for id in 1..=5 {
        assert_eq!(fulfillment.calls_for(OrderId(id)), 1);
    }
}

#[tokio::test]
async fn test_submit_after_shutdown_fails_fast() {
    for overflow in [OverflowPolicy::Reject, OverflowPolicy::Wait] {
        let dispatcher = OrderDispatcher::new(
            &config(1, 1, overflow),
            Arc::new(RecordingFulfillment::new(Duration::ZERO)),
        );
        dispatcher.start().unwrap();
        dispatcher.shutdown().await.unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Closed);

        let result = tokio::time::timeout(Duration::from_secs(1), dispatcher.submit(order(9)))
            .await
            .expect("submit must not block after shutdown");
        assert_eq!(result, Err(DispatchError::DispatcherClosed));
    }
}

/// Submissions are refused from the moment shutdown begins, while earlier
/// work is still draining.
#[tokio::test(start_paused = true)]
async fn test_submit_while_draining_is_refused() {
    for overflow in [OverflowPolicy::Reject, OverflowPolicy::Wait] {
        let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_secs(2)));
        let dispatcher = Arc::new(OrderDispatcher::new(
            &config(1, 1, overflow),
            fulfillment.clone(),
        ));
        dispatcher.start().unwrap();
        dispatcher.submit(order(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dispatcher.in_flight(), 1);

        let draining = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.shutdown().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dispatcher.state(), DispatcherState::Draining);

        let result = tokio::time::timeout(Duration::from_millis(100), dispatcher.submit(order(2)))
            .await
            .expect("submit must not block while draining");
        assert_eq!(result, Err(DispatchError::DispatcherClosed));

        let report = draining.await.unwrap().unwrap();
        assert_eq!(report.fulfilled, 1);
        assert_eq!(fulfillment.calls_for(OrderId(2)), 0);
        assert_eq!(dispatcher.state(), DispatcherState::Closed);
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_policy_applies_backpressure() {
    let fulfillment = Arc::new(RecordingFulfillment::new(Duration::from_millis(10)));
    let dispatcher = OrderDispatcher::new(
        &config(1, 1, OverflowPolicy::Wait),
        fulfillment.clone(),
    );
    dispatcher.start().unwrap();

    for id in 1..=5 {
        dispatcher.submit(order(id)).await.unwrap();
    }
    let report = dispatcher.shutdown().await.unwrap();
    assert_eq!(report.fulfilled, 5);
    assert_eq!(fulfillment.max_concurrent(), 1);
}

/// A failing or panicking callback is reported as a fault, releases its
/// permit, and does not stop the orders behind it.
#[tokio::test(start_paused = true)]
async fn test_faults_are_isolated_and_release_permits() {
    let fulfillment = Arc::new(
        RecordingFulfillment::new(Duration::from_millis(10))
            .panicking_for([1])
            .failing_for([2]),
    );
    let dispatcher = OrderDispatcher::new(
        &config(10, 1, OverflowPolicy::Reject),
        fulfillment.clone(),
    );
    let mut faults = dispatcher.take_faults().unwrap();
    assert!(dispatcher.take_faults().is_none());
    dispatcher.start().unwrap();

    for id in 1..=4 {
        dispatcher.submit(order(id)).await.unwrap();
    }
    let report = dispatcher.shutdown().await.unwrap();

    assert_eq!(report.fulfilled, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(fulfillment.completed(), 2);
    assert_eq!(dispatcher.in_flight(), 0);

    let first = faults.recv().await.unwrap();
    assert!(matches!(first, FulfillmentFault::Panicked { order_id: OrderId(1), .. }));
    let second = faults.recv().await.unwrap();
    assert!(matches!(second, FulfillmentFault::Failed { order_id: OrderId(2), .. }));
    assert!(faults.try_recv().is_err());
}
