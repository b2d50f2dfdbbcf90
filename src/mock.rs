//! # Test Doubles
//!
//! Scripted implementations of the three outbound ports, for testing the
//! validator and dispatcher without real collaborators.
//!
//! Each double sleeps for a configured delay (so paused-time tests can drive
//! it deterministically), answers with a scripted result, and records what it
//! saw. The check doubles answer without yielding when the delay is zero.
//!
//! ```ignore
//! let payment = Arc::new(ScriptedPayment::approve_after(Duration::from_secs(3)));
//! let inventory = Arc::new(ScriptedInventory::out_of_stock_after(Duration::from_secs(1)));
//! let validator = OrderValidator::new(payment.clone(), inventory);
//!
//! let verdict = validator.validate_within(&order, Duration::from_secs(5)).await;
//! assert_eq!(verdict, Err(ValidationFailure::ItemOutOfStock));
//! assert_eq!(payment.in_flight(), 0); // cancelled call was dropped
//! ```

use crate::dispatcher::{FulfillOrder, FulfillmentError};
use crate::model::{Item, Order, OrderId, PaymentMethod};
use crate::validator::{Authorization, CheckError, InventoryChecker, PaymentAuthorizer};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Counts a call as in flight until dropped, including on cancellation.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> (Self, usize) {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        (Self(counter), now)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A zero delay answers on the first poll, like a cached response.
async fn respond_after(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// PAYMENT
// =============================================================================

/// A payment authorizer that answers the same way every time.
pub struct ScriptedPayment {
    delay: Duration,
    answer: Result<Authorization, CheckError>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    amounts: Mutex<Vec<f64>>,
}

impl ScriptedPayment {
    fn new(delay: Duration, answer: Result<Authorization, CheckError>) -> Self {
        Self {
            delay,
            answer,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            amounts: Mutex::new(Vec::new()),
        }
    }

    pub fn approve_after(delay: Duration) -> Self {
        Self::new(delay, Ok(Authorization::Approved))
    }

    pub fn decline_after(delay: Duration) -> Self {
        Self::new(delay, Ok(Authorization::Declined))
    }

    pub fn unavailable_after(delay: Duration) -> Self {
        Self::new(
            delay,
            Err(CheckError::Unavailable("payment gateway offline".into())),
        )
    }

    /// Answers with something the gateway client cannot interpret.
    pub fn malformed_after(delay: Duration) -> Self {
        Self::new(
            delay,
            Err(CheckError::Backend("unparseable authorization response".into())),
        )
    }

    /// Number of times `pre_authorize` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that have started but neither returned nor been dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Amounts passed to `pre_authorize`, in call order.
    pub fn amounts(&self) -> Vec<f64> {
        self.amounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentAuthorizer for ScriptedPayment {
    async fn pre_authorize(
        &self,
        _payment: &PaymentMethod,
        amount: f64,
    ) -> Result<Authorization, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.amounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(amount);
        let (_guard, _) = InFlight::enter(&self.in_flight);
        respond_after(self.delay).await;
        self.answer.clone()
    }
}

// =============================================================================
// INVENTORY
// =============================================================================

/// An inventory checker that answers the same way every time.
pub struct ScriptedInventory {
    delay: Duration,
    answer: Result<bool, CheckError>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
}

impl ScriptedInventory {
    fn new(delay: Duration, answer: Result<bool, CheckError>) -> Self {
        Self {
            delay,
            answer,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn in_stock_after(delay: Duration) -> Self {
        Self::new(delay, Ok(true))
    }

    pub fn out_of_stock_after(delay: Duration) -> Self {
        Self::new(delay, Ok(false))
    }

    pub fn unavailable_after(delay: Duration) -> Self {
        Self::new(
            delay,
            Err(CheckError::Unavailable("inventory service offline".into())),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryChecker for ScriptedInventory {
    async fn items_in_stock(&self, _items: &[Item]) -> Result<bool, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (_guard, _) = InFlight::enter(&self.in_flight);
        respond_after(self.delay).await;
        self.answer.clone()
    }
}

// =============================================================================
// FULFILLMENT
// =============================================================================

/// A fulfillment callback that records every invocation and the peak number
/// of callbacks running at the same time.
///
/// Selected orders can be made to fail or panic.
pub struct RecordingFulfillment {
    delay: Duration,
    failing: HashSet<OrderId>,
    panicking: HashSet<OrderId>,
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    calls: Mutex<HashMap<OrderId, usize>>,
    started: Mutex<Vec<OrderId>>,
}

impl RecordingFulfillment {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failing: HashSet::new(),
            panicking: HashSet::new(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Orders in `ids` return a [`FulfillmentError`].
    pub fn failing_for(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.failing.extend(ids.into_iter().map(OrderId));
        self
    }

    /// Orders in `ids` panic mid-fulfillment.
    pub fn panicking_for(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.panicking.extend(ids.into_iter().map(OrderId));
        self
    }

    pub fn total_calls(&self) -> usize {
        self.lock_calls().values().sum()
    }

    pub fn calls_for(&self, id: OrderId) -> usize {
        self.lock_calls().get(&id).copied().unwrap_or(0)
    }

    /// Order ids in the order their callbacks started.
    pub fn started_order(&self) -> Vec<OrderId> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Callbacks that ran to a successful end.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Callbacks currently executing.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of callbacks observed executing at once.
    pub fn max_concurrent(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<OrderId, usize>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FulfillOrder for RecordingFulfillment {
    async fn fulfill(&self, order: &Order) -> Result<(), FulfillmentError> {
        let (_guard, now) = InFlight::enter(&self.active);
        self.peak.fetch_max(now, Ordering::SeqCst);
        *self.lock_calls().entry(order.id).or_insert(0) += 1;
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order.id);

        tokio::time::sleep(self.delay).await;

        if self.panicking.contains(&order.id) {
            panic!("fulfillment of {} blew up", order.id);
        }
        if self.failing.contains(&order.id) {
            return Err(FulfillmentError::Failed(format!(
                "shipping refused {}",
                order.id
            )));
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
