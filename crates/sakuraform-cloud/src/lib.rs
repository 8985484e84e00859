//! Sakuraform provisioning engine
//!
//! Drives remote resources through create/update/delete against an
//! eventually-consistent cloud API. Each workflow issues a mutating call,
//! then blocks in a poller until the remote side converges or a bounded
//! budget runs out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 sakuraform CLI                   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               sakuraform-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   ApplianceOrchestrator                  │   │
//! │  │   SharedParentOrchestrator ── LockService│   │
//! │  └───────────────┬──────────────────────────┘   │
//! │  ┌───────────────▼──────────────────────────┐   │
//! │  │   poll_until + BackoffBudget             │   │
//! │  │   ready / down / job-done pollers        │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Provider API │  │  State Mgmt  │            │
//! │  │   traits     │  │              │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼─────────────┐
//! │ sakuraform-cloud-   │
//! │ sakura (HTTP API)   │
//! └─────────────────────┘
//! ```
//!
//! Every operation runs inside an [`OperationContext`]: a deadline plus a
//! cancellation token. Both interrupt remote calls and poll sleeps.

pub mod backoff;
pub mod context;
pub mod error;
pub mod lock;
pub mod model;
pub mod orchestrator;
pub mod poller;
pub mod provider;
pub mod state;

// Re-exports
pub use backoff::{BackoffBudget, PollPolicy};
pub use context::OperationContext;
pub use error::{CloudError, FailureKind, Phase, PollError, ProvisionError, Result};
pub use lock::{LockGuard, LockService, NamedMutex};
pub use orchestrator::{
    ApplianceOrchestrator, OperationTimeouts, PollPolicies, SharedParentOrchestrator,
};
pub use poller::{poll_until, wait_until_down, wait_until_job_done, wait_until_ready};
pub use provider::{ApplianceApi, SharedParentApi};
pub use state::{ResourceKind, ResourceState, ResourceStatus, StateFile, StateManager};

// Keep the token type reachable for callers without a direct dependency
pub use tokio_util::sync::CancellationToken;
