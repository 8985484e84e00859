//! Bounded retry/timeout budget shared by all pollers

use crate::error::PollError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Retry and timeout policy of one poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Overall wall-clock budget of one poll invocation
    pub timeout: Duration,

    /// Consecutive errors tolerated; one more is fatal
    pub error_threshold: u32,

    /// Wait after a failed read
    pub error_sleep: Duration,

    /// Wait after a successful read that is not yet in the target state
    pub pending_sleep: Duration,
}

impl PollPolicy {
    pub const DEFAULT_ERROR_THRESHOLD: u32 = 5;

    /// Appliance becoming available, up and healthy
    pub const fn readiness() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            error_threshold: Self::DEFAULT_ERROR_THRESHOLD,
            error_sleep: Duration::from_secs(10),
            pending_sleep: Duration::from_secs(30),
        }
    }

    /// Appliance instance going down
    pub const fn down() -> Self {
        Self {
            timeout: Duration::from_secs(15 * 60),
            error_threshold: Self::DEFAULT_ERROR_THRESHOLD,
            error_sleep: Duration::from_secs(10),
            pending_sleep: Duration::from_secs(20),
        }
    }

    /// Server-side job reaching `Done`
    pub const fn job() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            error_threshold: Self::DEFAULT_ERROR_THRESHOLD,
            error_sleep: Duration::from_secs(10),
            pending_sleep: Duration::from_secs(20),
        }
    }
}

/// Runtime budget of a single poll invocation
///
/// The error counter only grows; a new invocation starts a new budget.
#[derive(Debug)]
pub struct BackoffBudget {
    policy: PollPolicy,
    deadline: Instant,
    allowance: Duration,
    error_count: u32,
}

impl BackoffBudget {
    /// Start a budget now. The deadline is the earlier of the policy timeout
    /// and `outer_deadline`.
    pub fn start(policy: PollPolicy, outer_deadline: Option<Instant>) -> Self {
        let now = Instant::now();
        let own = now + policy.timeout;
        let deadline = match outer_deadline {
            Some(outer) if outer < own => outer,
            _ => own,
        };

        Self {
            policy,
            deadline,
            allowance: deadline.saturating_duration_since(now),
            error_count: 0,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn check_deadline(&self) -> Result<(), PollError> {
        if Instant::now() > self.deadline {
            return Err(PollError::DeadlineExceeded(self.allowance));
        }
        Ok(())
    }

    /// Count a transient error. Returns how long to wait before retrying.
    pub fn next_on_error(&mut self, error: impl Display) -> Result<Duration, PollError> {
        self.error_count += 1;
        if self.error_count > self.policy.error_threshold {
            return Err(PollError::ErrorBudgetExceeded {
                threshold: self.policy.error_threshold,
                last_error: error.to_string(),
            });
        }
        self.check_deadline()?;
        Ok(self.policy.error_sleep)
    }

    /// Count failed sub-operations reported by an otherwise successful read.
    /// They share the counter with transient errors.
    pub fn record_sub_failures(&mut self, failed: u32) -> Result<(), PollError> {
        if failed == 0 {
            return Ok(());
        }
        self.error_count += failed;
        if self.error_count > self.policy.error_threshold {
            return Err(PollError::ErrorBudgetExceeded {
                threshold: self.policy.error_threshold,
                last_error: format!("{} sub-operation(s) reported failure", failed),
            });
        }
        Ok(())
    }

    /// The read succeeded but the target state is not reached yet
    pub fn next_on_pending(&self) -> Result<Duration, PollError> {
        self.check_deadline()?;
        Ok(self.policy.pending_sleep)
    }

    /// Drive `fut` unless `cancel` fires or the deadline passes first
    pub async fn interruptible<F: Future>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<F::Output, PollError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PollError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => {
                Err(PollError::DeadlineExceeded(self.allowance))
            }
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PollPolicy {
        PollPolicy {
            timeout: Duration::from_secs(60),
            error_threshold: 5,
            error_sleep: Duration::from_secs(10),
            pending_sleep: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_error_is_fatal() {
        let mut budget = BackoffBudget::start(policy(), None);

        for _ in 0..5 {
            assert_eq!(budget.next_on_error("boom").unwrap(), Duration::from_secs(10));
        }

        let err = budget.next_on_error("boom").unwrap_err();
        assert!(matches!(
            err,
            PollError::ErrorBudgetExceeded { threshold: 5, ref last_error } if last_error == "boom"
        ));
        assert_eq!(budget.error_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_failures_share_the_counter() {
        let mut budget = BackoffBudget::start(policy(), None);
        budget.next_on_error("read failed").unwrap();
        budget.record_sub_failures(4).unwrap();
        assert_eq!(budget.error_count(), 5);

        let err = budget.record_sub_failures(1).unwrap_err();
        assert!(matches!(err, PollError::ErrorBudgetExceeded { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_after_deadline_is_fatal() {
        let budget = BackoffBudget::start(policy(), None);
        assert_eq!(budget.next_on_pending().unwrap(), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(61)).await;
        let err = budget.next_on_pending().unwrap_err();
        assert!(matches!(err, PollError::DeadlineExceeded(d) if d == Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outer_deadline_wins_when_earlier() {
        let outer = Instant::now() + Duration::from_secs(15);
        let budget = BackoffBudget::start(policy(), Some(outer));
        assert_eq!(budget.deadline(), outer);

        let later = Instant::now() + Duration::from_secs(3600);
        let budget = BackoffBudget::start(policy(), Some(later));
        assert_eq!(budget.deadline(), Instant::now() + Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interruptible_sleep_stops_at_deadline() {
        let budget = BackoffBudget::start(policy(), None);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let result = budget
            .interruptible(&cancel, tokio::time::sleep(Duration::from_secs(600)))
            .await;

        assert!(matches!(result, Err(PollError::DeadlineExceeded(_))));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn test_presets() {
        assert_eq!(PollPolicy::readiness().pending_sleep, Duration::from_secs(30));
        assert_eq!(PollPolicy::down().timeout, Duration::from_secs(15 * 60));
        assert_eq!(PollPolicy::job().pending_sleep, Duration::from_secs(20));
        for policy in [PollPolicy::readiness(), PollPolicy::down(), PollPolicy::job()] {
            assert_eq!(policy.error_threshold, 5);
            assert_eq!(policy.error_sleep, Duration::from_secs(10));
        }
    }
}
