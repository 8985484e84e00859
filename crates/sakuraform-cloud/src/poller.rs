//! Pollers that block until a remote appliance converges
//!
//! All three pollers share one loop, [`poll_until`]. Each supplies only a
//! probe that reads the remote side and classifies what it saw.

use crate::backoff::{BackoffBudget, PollPolicy};
use crate::context::OperationContext;
use crate::error::{CloudError, PollError};
use crate::model::{Availability, InstanceStatus, RemoteApplianceState};
use crate::provider::ApplianceApi;
use std::future::Future;

/// Classification of one probe
#[derive(Debug)]
pub enum Probe<T> {
    /// Target state reached
    Ready(T),
    /// Read succeeded, target state not reached yet
    Pending,
    /// Read failed; retried within the error budget
    Transient(CloudError),
    /// Provider reported a failure state; never retried
    Terminal(String),
}

/// A probe result plus failed sub-operations seen on the same read
#[derive(Debug)]
pub struct Observation<T> {
    pub probe: Probe<T>,
    pub failed_sub_operations: u32,
}

impl<T> Observation<T> {
    pub fn new(probe: Probe<T>) -> Self {
        Self {
            probe,
            failed_sub_operations: 0,
        }
    }

    pub fn ready(value: T) -> Self {
        Self::new(Probe::Ready(value))
    }

    pub fn pending() -> Self {
        Self::new(Probe::Pending)
    }

    pub fn transient(err: CloudError) -> Self {
        Self::new(Probe::Transient(err))
    }

    pub fn terminal(reason: impl Into<String>) -> Self {
        Self::new(Probe::Terminal(reason.into()))
    }

    pub fn with_sub_failures(mut self, failed: u32) -> Self {
        self.failed_sub_operations = failed;
        self
    }
}

/// Run `probe` until it reports [`Probe::Ready`] or the budget runs out
///
/// Failed sub-operations are counted before the probe verdict, so a read
/// that is both done and over budget fails.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    policy: PollPolicy,
    ctx: &OperationContext,
    mut probe: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Observation<T>>,
{
    let mut budget = BackoffBudget::start(policy, Some(ctx.deadline()));
    let cancel = ctx.cancel_token();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        budget.check_deadline()?;

        let observation = budget.interruptible(cancel, probe()).await?;
        budget.record_sub_failures(observation.failed_sub_operations)?;

        let delay = match observation.probe {
            Probe::Ready(value) => {
                tracing::debug!("{}: reached after {} attempt(s)", what, attempt);
                return Ok(value);
            }
            Probe::Terminal(reason) => {
                tracing::error!("{}: {}", what, reason);
                return Err(PollError::RemoteTerminal(reason));
            }
            Probe::Transient(err) => {
                tracing::warn!(
                    "{}: attempt {} failed ({} error(s) so far): {}",
                    what,
                    attempt,
                    budget.error_count() + 1,
                    err
                );
                budget.next_on_error(&err)?
            }
            Probe::Pending => {
                tracing::debug!("{}: not yet (attempt {})", what, attempt);
                budget.next_on_pending()?
            }
        };

        budget
            .interruptible(cancel, tokio::time::sleep(delay))
            .await?;
    }
}

/// Block until the appliance is available, up and healthy
///
/// `availability == failed` aborts on the first read. Read and health-check
/// failures share one error counter.
pub async fn wait_until_ready<A>(
    api: &A,
    id: &str,
    policy: PollPolicy,
    ctx: &OperationContext,
) -> Result<RemoteApplianceState, PollError>
where
    A: ApplianceApi + ?Sized,
{
    let what = format!("wait for [{}] ready", id);
    poll_until(&what, policy, ctx, move || async move {
        let state = match api.read(id).await {
            Ok(state) => state,
            Err(err) => return Observation::transient(err),
        };

        if state.availability == Availability::Failed {
            return Observation::terminal(format!("availability of [{}] is failed", id));
        }

        match api.read_health(id).await {
            Ok(health) if state.is_ready(health) => Observation::ready(RemoteApplianceState {
                health_status: health,
                ..state
            }),
            Ok(health) => {
                tracing::debug!(
                    "[{}] availability={} instance={} health={}",
                    id,
                    state.availability,
                    state.instance_status,
                    health
                );
                Observation::pending()
            }
            Err(err) => Observation::transient(err),
        }
    })
    .await
}

/// Block until the appliance instance is down
pub async fn wait_until_down<A>(
    api: &A,
    id: &str,
    policy: PollPolicy,
    ctx: &OperationContext,
) -> Result<(), PollError>
where
    A: ApplianceApi + ?Sized,
{
    let what = format!("wait for [{}] down", id);
    poll_until(&what, policy, ctx, move || async move {
        match api.read(id).await {
            Ok(state) if state.instance_status == InstanceStatus::Down => Observation::ready(()),
            Ok(_) => Observation::pending(),
            Err(err) => Observation::transient(err),
        }
    })
    .await
}

/// Block until a job of `job_type` reports `Done` in the job-status feed
///
/// Every add-node record of `id` that reports `failed` counts against the
/// same error budget as a failed read, on every poll that still sees it.
pub async fn wait_until_job_done<A>(
    api: &A,
    id: &str,
    job_type: &str,
    policy: PollPolicy,
    ctx: &OperationContext,
) -> Result<(), PollError>
where
    A: ApplianceApi + ?Sized,
{
    let what = format!("wait for [{}] {} processing", id, job_type);
    poll_until(&what, policy, ctx, move || async move {
        match api.read_job_status(id).await {
            Ok(feed) => {
                let observation = if feed.is_done(job_type) {
                    Observation::ready(())
                } else {
                    Observation::pending()
                };
                observation.with_sub_failures(feed.failed_nodes(id))
            }
            Err(err) => Observation::transient(err),
        }
    })
    .await
}
