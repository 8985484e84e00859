//! Lifecycle workflows
//!
//! - [`ApplianceOrchestrator`]: create → wait ready → configure → wait job,
//!   update → apply → wait job, stop → wait down → delete.
//! - [`SharedParentOrchestrator`]: child mutations of a shared parent,
//!   serialized by a [`LockService`](crate::lock::LockService) keyed on the
//!   parent id.
//!
//! Any fatal outcome aborts the workflow. Nothing is rolled back.

mod appliance;
mod shared_parent;

pub use appliance::ApplianceOrchestrator;
pub use shared_parent::SharedParentOrchestrator;

use crate::backoff::PollPolicy;
use crate::context::OperationContext;
use crate::error::{Phase, ProvisionError, Result};
use std::future::Future;
use std::time::Duration;

/// Wall-clock budget of whole lifecycle operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
    /// Subnet removal is a single call and gets a shorter budget
    pub subnet_delete: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(60 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(20 * 60),
            subnet_delete: Duration::from_secs(5 * 60),
        }
    }
}

/// Poll policies of the three pollers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicies {
    pub readiness: PollPolicy,
    pub down: PollPolicy,
    pub job: PollPolicy,
}

impl Default for PollPolicies {
    fn default() -> Self {
        Self {
            readiness: PollPolicy::readiness(),
            down: PollPolicy::down(),
            job: PollPolicy::job(),
        }
    }
}

/// Run one remote call inside `ctx`, tagging failures with the phase
async fn call<T, F>(
    ctx: &OperationContext,
    resource: &'static str,
    id: &str,
    phase: Phase,
    fut: F,
) -> std::result::Result<T, ProvisionError>
where
    F: Future<Output = Result<T>>,
{
    match ctx.run(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ProvisionError::new(resource, id, phase, err)),
        Err(interrupted) => Err(ProvisionError::new(resource, id, phase, interrupted)),
    }
}

/// Like [`call`], but a not-found answer becomes `None`
async fn call_optional<T, F>(
    ctx: &OperationContext,
    resource: &'static str,
    id: &str,
    phase: Phase,
    fut: F,
) -> std::result::Result<Option<T>, ProvisionError>
where
    F: Future<Output = Result<T>>,
{
    match ctx.run(fut).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(err)) if err.is_not_found() => Ok(None),
        Ok(Err(err)) => Err(ProvisionError::new(resource, id, phase, err)),
        Err(interrupted) => Err(ProvisionError::new(resource, id, phase, interrupted)),
    }
}
