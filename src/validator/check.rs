//! # Timed Checks
//!
//! A [`TimedCheck`] runs one named operation that must complete, fail, or be
//! cancelled within a bound. It races the operation against the shared
//! cancellation token and the shared deadline, and the losing futures are
//! dropped on the spot.
//!
//! The operation is always polled before the token. A check that has already
//! finished, or whose deadline has passed, reports its own outcome even when
//! the scope was cancelled at the same moment. Only a check that is still
//! genuinely outstanding reports [`CheckOutcome::Cancelled`].

use crate::panic::describe_panic;
use crate::validator::ValidationFailure;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Which of the two order checks is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Payment,
    Inventory,
}

impl CheckKind {
    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Payment => "payment",
            CheckKind::Inventory => "inventory",
        }
    }

    /// The failure reported when this check does not complete in time.
    pub fn timeout_failure(self) -> ValidationFailure {
        match self {
            CheckKind::Payment => ValidationFailure::PaymentTimeout,
            CheckKind::Inventory => ValidationFailure::InventoryTimeout,
        }
    }
}

/// How a single check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed(ValidationFailure),
    /// Stopped because the shared scope was cancelled. Never a verdict.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub kind: CheckKind,
    pub outcome: CheckOutcome,
}

/// One check bounded by a deadline and a shared cancellation scope.
#[derive(Debug, Clone)]
pub struct TimedCheck {
    kind: CheckKind,
    deadline: Instant,
    scope: CancellationToken,
}

impl TimedCheck {
    pub fn new(kind: CheckKind, deadline: Instant, scope: CancellationToken) -> Self {
        Self {
            kind,
            deadline,
            scope,
        }
    }

    /// Drives `check` to completion unless the scope is cancelled or the
    /// deadline passes first.
    ///
    /// A panic inside `check` is caught and reported as this check's timeout
    /// failure, so a faulty collaborator cannot take the validator down.
    pub async fn run<F>(self, check: F) -> CheckReport
    where
        F: Future<Output = Result<(), ValidationFailure>> + Send,
    {
        let check_name = self.kind.name();
        let guarded = AssertUnwindSafe(check).catch_unwind();

        let outcome = tokio::select! {
            biased;
            result = tokio::time::timeout_at(self.deadline, guarded) => match result {
                Ok(Ok(Ok(()))) => CheckOutcome::Passed,
                Ok(Ok(Err(failure))) => CheckOutcome::Failed(failure),
                Ok(Err(panic)) => {
                    let msg = describe_panic(&*panic);
                    error!(check = check_name, panic = %msg, "Check panicked");
                    CheckOutcome::Failed(self.kind.timeout_failure())
                }
                Err(_) => CheckOutcome::Failed(self.kind.timeout_failure()),
            },
            _ = self.scope.cancelled() => {
                // The deadline timer may not have fired yet on this worker.
                if Instant::now() >= self.deadline {
                    CheckOutcome::Failed(self.kind.timeout_failure())
                } else {
                    CheckOutcome::Cancelled
                }
            }
        };

        debug!(check = check_name, ?outcome, "Check finished");
        CheckReport {
            kind: self.kind,
            outcome,
        }
    }
}
