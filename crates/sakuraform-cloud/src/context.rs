//! Per-operation deadline and cancellation

use crate::error::PollError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation scope of one lifecycle operation
///
/// Every remote call and every poll loop of the operation races against
/// both, so either one interrupts the operation mid-call or mid-sleep.
#[derive(Debug, Clone)]
pub struct OperationContext {
    timeout: Duration,
    deadline: Instant,
    cancel: CancellationToken,
}

impl OperationContext {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    /// Context that is only bounded by `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, CancellationToken::new())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` to completion unless the operation is cancelled or its
    /// deadline passes first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, PollError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PollError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => {
                Err(PollError::DeadlineExceeded(self.timeout))
            }
            output = fut => Ok(output),
        }
    }
}
