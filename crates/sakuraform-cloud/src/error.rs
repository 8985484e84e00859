//! Error types for provisioning workflows
//!
//! Three layers:
//!
//! - [`CloudError`]: a single remote call or local state operation failed.
//!   Inside a poll loop these are transient and retried.
//! - [`PollError`]: a poll loop reached a fatal terminal state.
//! - [`ProvisionError`]: what an orchestrator hands back to its caller. It
//!   names the resource, the phase that failed and the cause.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single provider call or state operation
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Fatal outcome of a poll loop
#[derive(Error, Debug)]
pub enum PollError {
    /// The provider reported a failure state. Never retried.
    #[error("remote reported terminal failure: {0}")]
    RemoteTerminal(String),

    /// More than `threshold` transient errors or failed sub-operations
    /// within one poll invocation.
    #[error("exceeds {threshold} retry limit: {last_error}")]
    ErrorBudgetExceeded { threshold: u32, last_error: String },

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("cancelled")]
    Cancelled,
}

/// Step of a workflow, used to tell the operator where things stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Create,
    WaitReady,
    SetParameters,
    WaitJob(String),
    Update,
    ApplyChanges,
    Stop,
    WaitDown,
    Delete,
    Read,
    AddNodes,
    AddSubnet,
    UpdateSubnet,
    DeleteSubnet,
    UpdateBandwidth,
    DeleteInternet,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::WaitReady => write!(f, "wait for ready"),
            Phase::SetParameters => write!(f, "set parameters"),
            Phase::WaitJob(job_type) => write!(f, "wait for {} processing", job_type),
            Phase::Update => write!(f, "update"),
            Phase::ApplyChanges => write!(f, "apply changes"),
            Phase::Stop => write!(f, "stop"),
            Phase::WaitDown => write!(f, "wait for down"),
            Phase::Delete => write!(f, "delete"),
            Phase::Read => write!(f, "read"),
            Phase::AddNodes => write!(f, "add nodes"),
            Phase::AddSubnet => write!(f, "add subnet"),
            Phase::UpdateSubnet => write!(f, "update subnet"),
            Phase::DeleteSubnet => write!(f, "delete subnet"),
            Phase::UpdateBandwidth => write!(f, "update bandwidth"),
            Phase::DeleteInternet => write!(f, "delete internet"),
        }
    }
}

/// Underlying reason a workflow aborted
#[derive(Error, Debug)]
pub enum FailureCause {
    #[error(transparent)]
    Api(#[from] CloudError),

    #[error(transparent)]
    Wait(#[from] PollError),
}

/// Coarse classification of a [`ProvisionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Api,
    RemoteTerminal,
    ErrorBudgetExceeded,
    DeadlineExceeded,
    Cancelled,
}

/// A workflow failed. The remote resource may be partially provisioned.
#[derive(Error, Debug)]
#[error("{resource}[{id}]: {phase} failed: {cause}")]
pub struct ProvisionError {
    /// Resource kind, e.g. "NoSQL" or "Subnet"
    pub resource: &'static str,
    pub id: String,
    pub phase: Phase,
    #[source]
    pub cause: FailureCause,
}

impl ProvisionError {
    pub fn new(
        resource: &'static str,
        id: impl Into<String>,
        phase: Phase,
        cause: impl Into<FailureCause>,
    ) -> Self {
        Self {
            resource,
            id: id.into(),
            phase,
            cause: cause.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match &self.cause {
            FailureCause::Api(_) => FailureKind::Api,
            FailureCause::Wait(PollError::RemoteTerminal(_)) => FailureKind::RemoteTerminal,
            FailureCause::Wait(PollError::ErrorBudgetExceeded { .. }) => {
                FailureKind::ErrorBudgetExceeded
            }
            FailureCause::Wait(PollError::DeadlineExceeded(_)) => FailureKind::DeadlineExceeded,
            FailureCause::Wait(PollError::Cancelled) => FailureKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_error_message_names_phase_and_cause() {
        let err = ProvisionError::new(
            "NoSQL",
            "113700000001",
            Phase::WaitJob("SetParameter".to_string()),
            PollError::ErrorBudgetExceeded {
                threshold: 5,
                last_error: "API error: 503".to_string(),
            },
        );

        assert_eq!(
            err.to_string(),
            "NoSQL[113700000001]: wait for SetParameter processing failed: exceeds 5 retry limit: API error: 503"
        );
        assert_eq!(err.kind(), FailureKind::ErrorBudgetExceeded);
    }

    #[test]
    fn test_api_failure_kind() {
        let err = ProvisionError::new(
            "Subnet",
            "113700000002",
            Phase::AddSubnet,
            CloudError::ApiError("conflict".to_string()),
        );
        assert_eq!(err.kind(), FailureKind::Api);
        assert!(err.to_string().contains("add subnet"));
    }

    #[test]
    fn test_router_delete_phase_is_distinct() {
        assert_eq!(Phase::DeleteInternet.to_string(), "delete internet");
        assert_ne!(Phase::DeleteInternet.to_string(), Phase::Delete.to_string());
    }
}
