//! # Order Dispatcher
//!
//! Decouples order submission (fast) from order fulfillment (slow, bounded).
//!
//! Submitted orders land in a bounded FIFO intake queue. A single intake loop
//! dequeues them in order, takes one of `max_concurrency` permits for each,
//! and runs the [`FulfillOrder`] callback on its own task. The permit is held
//! for the whole fulfillment and released on every exit path, including a
//! callback error or panic.
//!
//! ## Lifecycle
//!
//! `Open` -> `Draining` -> `Closed`.
//!
//! - [`OrderDispatcher::start`] spawns the intake loop. Calling it twice is a
//!   usage error.
//! - [`OrderDispatcher::submit`] enqueues while `Open`; afterwards it fails
//!   with [`DispatchError::DispatcherClosed`].
//! - [`OrderDispatcher::shutdown`] closes the intake path, waits for every
//!   queued and in-flight order to finish and returns a [`DrainReport`].
//!
//! Producers must be quiesced before calling `shutdown`. A submission racing
//! with shutdown under [`OverflowPolicy::Wait`] is either rejected or fully
//! fulfilled, never lost in between.

pub mod error;
pub mod fulfillment;

pub use error::*;
pub use fulfillment::*;

use crate::model::Order;
use crate::panic::describe_panic;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn, Instrument};

const FAULT_BUFFER: usize = 256;

/// What `submit` does when the intake queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Fail immediately with [`DispatchError::QueueFull`].
    #[default]
    Reject,
    /// Suspend the caller until the queue has room.
    Wait,
}

/// Sizing of the intake queue and worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub queue_capacity: usize,
    pub max_concurrency: usize,
    pub overflow: OverflowPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            max_concurrency: 3,
            overflow: OverflowPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Open,
    Draining,
    Closed,
}

/// Outcome counts of everything the intake loop handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub fulfilled: usize,
    pub failed: usize,
}

struct Intake {
    state: DispatcherState,
    sender: Option<mpsc::Sender<Order>>,
    receiver: Option<mpsc::Receiver<Order>>,
    worker: Option<JoinHandle<DrainReport>>,
}

/// Bounded-concurrency dispatcher for accepted orders.
pub struct OrderDispatcher {
    intake: Mutex<Intake>,
    pool: WorkerPool,
    overflow: OverflowPolicy,
    faults: Mutex<Option<mpsc::Receiver<FulfillmentFault>>>,
}

impl OrderDispatcher {
    /// Creates a dispatcher that is open for submissions but not yet draining.
    ///
    /// A zero capacity or concurrency is raised to one.
    pub fn new(config: &DispatcherConfig, fulfiller: Arc<dyn FulfillOrder>) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (fault_tx, fault_rx) = mpsc::channel(FAULT_BUFFER);
        let max_concurrency = config.max_concurrency.max(1);

        Self {
            intake: Mutex::new(Intake {
                state: DispatcherState::Open,
                sender: Some(sender),
                receiver: Some(receiver),
                worker: None,
            }),
            pool: WorkerPool {
                fulfiller,
                permits: Arc::new(Semaphore::new(max_concurrency)),
                max_concurrency,
                faults: fault_tx,
            },
            overflow: config.overflow,
            faults: Mutex::new(Some(fault_rx)),
        }
    }

    fn lock_intake(&self) -> MutexGuard<'_, Intake> {
        self.intake.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> DispatcherState {
        self.lock_intake().state
    }

    /// Number of fulfillments currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.pool.max_concurrency - self.pool.permits.available_permits()
    }

    /// Hands out the fault channel. Only the first call gets it.
    pub fn take_faults(&self) -> Option<mpsc::Receiver<FulfillmentFault>> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Begins draining the intake queue on a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), DispatchError> {
        let mut intake = self.lock_intake();
        if intake.state != DispatcherState::Open {
            return Err(DispatchError::DispatcherClosed);
        }
        let receiver = intake
            .receiver
            .take()
            .ok_or(DispatchError::AlreadyStarted)?;
        intake.worker = Some(tokio::spawn(self.pool.clone().run(receiver)));
        info!(max_concurrency = self.pool.max_concurrency, "Dispatcher started");
        Ok(())
    }

    /// Enqueues an order for fulfillment.
    ///
    /// With [`OverflowPolicy::Reject`] this never suspends: a full queue
    /// yields [`DispatchError::QueueFull`]. With [`OverflowPolicy::Wait`] it
    /// suspends until the queue has room.
    pub async fn submit(&self, order: Order) -> Result<(), DispatchError> {
        let order_id = order.id;
        let sender = {
            let intake = self.lock_intake();
            let sender = match (intake.state, intake.sender.as_ref()) {
                (DispatcherState::Open, Some(sender)) => sender,
                _ => {
                    debug!(%order_id, "Submit after shutdown");
                    return Err(DispatchError::DispatcherClosed);
                }
            };
            match self.overflow {
                OverflowPolicy::Reject => {
                    return match sender.try_send(order) {
                        Ok(()) => {
                            debug!(%order_id, "Queued");
                            Ok(())
                        }
                        Err(TrySendError::Full(_)) => {
                            warn!(%order_id, "Queue full");
                            Err(DispatchError::QueueFull)
                        }
                        Err(TrySendError::Closed(_)) => Err(DispatchError::DispatcherClosed),
                    };
                }
                OverflowPolicy::Wait => sender.clone(),
            }
        };

        sender
            .send(order)
            .await
            .map_err(|_| DispatchError::DispatcherClosed)?;
        debug!(%order_id, "Queued");
        Ok(())
    }

    /// Closes the intake path and waits for every queued and in-flight order.
    ///
    /// A dispatcher that was never started drains its queue here. After this
    /// returns no further fulfillment callbacks run.
    pub async fn shutdown(&self) -> Result<DrainReport, DispatchError> {
        let worker = {
            let mut intake = self.lock_intake();
            if intake.state != DispatcherState::Open {
                return Err(DispatchError::DispatcherClosed);
            }
            intake.state = DispatcherState::Draining;
            intake.sender = None;

            // Never started: drain what was buffered.
            intake.worker.take().or_else(|| {
                intake
                    .receiver
                    .take()
                    .map(|receiver| tokio::spawn(self.pool.clone().run(receiver)))
            })
        };
        info!("Dispatcher draining");

        let report = match worker {
            Some(worker) => worker.await.unwrap_or_else(|e| {
                error!(error = %e, "Intake loop failed");
                DrainReport::default()
            }),
            None => DrainReport::default(),
        };

        self.lock_intake().state = DispatcherState::Closed;
        info!(
            fulfilled = report.fulfilled,
            failed = report.failed,
            "Dispatcher closed"
        );
        Ok(report)
    }
}

#[derive(Clone)]
struct WorkerPool {
    fulfiller: Arc<dyn FulfillOrder>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    faults: mpsc::Sender<FulfillmentFault>,
}

impl WorkerPool {
    /// Drains `receiver` until every sender is gone, then waits for the
    /// remaining workers.
    async fn run(self, mut receiver: mpsc::Receiver<Order>) -> DrainReport {
        let mut report = DrainReport::default();
        let mut workers = JoinSet::new();

        while let Some(order) = receiver.recv().await {
            let order_id = order.id;
            let permit = match self.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(%order_id, "Permit pool closed, dropping order");
                    report.failed += 1;
                    continue;
                }
            };
            debug!(%order_id, "Dequeued");

            let fulfiller = self.fulfiller.clone();
            let worker = async move {
                let _permit = permit;
                let result = AssertUnwindSafe(fulfiller.fulfill(&order))
                    .catch_unwind()
                    .await;
                match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(source)) => Err(FulfillmentFault::Failed { order_id, source }),
                    Err(panic) => Err(FulfillmentFault::Panicked {
                        order_id,
                        message: describe_panic(&*panic),
                    }),
                }
            };
            workers.spawn(worker.instrument(tracing::info_span!("fulfillment", %order_id)));

            while let Some(joined) = workers.try_join_next() {
                self.settle(joined, &mut report);
            }
        }

        while let Some(joined) = workers.join_next().await {
            self.settle(joined, &mut report);
        }
        report
    }

    fn settle(
        &self,
        joined: Result<Result<(), FulfillmentFault>, tokio::task::JoinError>,
        report: &mut DrainReport,
    ) {
        match joined {
            Ok(Ok(())) => report.fulfilled += 1,
            Ok(Err(fault)) => {
                report.failed += 1;
                warn!(order_id = %fault.order_id(), error = %fault, "Fulfillment fault");
                if self.faults.try_send(fault).is_err() {
                    debug!("Fault channel full or not taken");
                }
            }
            Err(e) => {
                report.failed += 1;
                error!(error = %e, "Fulfillment task failed to join");
            }
        }
    }
}
