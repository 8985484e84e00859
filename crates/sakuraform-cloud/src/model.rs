//! Resource model shared by the engine and provider adapters
//!
//! These are the engine's view of remote resources. Provider adapters map
//! their wire DTOs into these types; nothing here knows about JSON field
//! names of a particular API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Job type reported while configuration parameters are applied
pub const JOB_SET_PARAMETER: &str = "SetParameter";

/// Job type reported while pending changes are applied
pub const JOB_UPDATE: &str = "Update";

/// Job type reported while additional nodes join a cluster
pub const JOB_ADD_NODE: &str = "AddNode";

/// Lifecycle state of a managed appliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Migrating,
    Available,
    Failed,
    /// Any value this engine does not know about
    #[serde(other)]
    Unknown,
}

impl Availability {
    pub fn parse(value: &str) -> Self {
        match value {
            "migrating" => Availability::Migrating,
            "available" => Availability::Available,
            "failed" => Availability::Failed,
            _ => Availability::Unknown,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Migrating => write!(f, "migrating"),
            Availability::Available => write!(f, "available"),
            Availability::Failed => write!(f, "failed"),
            Availability::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether the appliance runtime is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Up,
    Down,
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "up" => InstanceStatus::Up,
            "down" => InstanceStatus::Down,
            _ => InstanceStatus::Unknown,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Up => write!(f, "up"),
            InstanceStatus::Down => write!(f, "down"),
            InstanceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of the appliance health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    #[serde(other)]
    Unknown,
}

impl HealthStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "healthy" => HealthStatus::Healthy,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Appliance as returned by the provider's read endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteApplianceState {
    pub id: String,
    pub name: String,
    pub zone: Option<String>,
    pub availability: Availability,
    pub instance_status: InstanceStatus,
    #[serde(default)]
    pub health_status: HealthStatus,
}

impl RemoteApplianceState {
    /// All three signals agree that the appliance can serve traffic
    pub fn is_ready(&self, health: HealthStatus) -> bool {
        self.availability == Availability::Available
            && self.instance_status == InstanceStatus::Up
            && health == HealthStatus::Healthy
    }
}

/// Status of a server-side job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(JobStatus::Pending),
            "Running" => Some(JobStatus::Running),
            "Done" => Some(JobStatus::Done),
            "Failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_type: String,
    pub job_status: JobStatus,
}

impl JobRecord {
    pub fn new(job_type: impl Into<String>, job_status: JobStatus) -> Self {
        Self {
            job_type: job_type.into(),
            job_status,
        }
    }
}

/// Per-node record of an add-nodes job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNodeRecord {
    pub appliance_id: String,
    pub availability: Availability,
}

/// Job-status feed of an appliance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusFeed {
    #[serde(default)]
    pub add_nodes: Vec<AddNodeRecord>,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

impl JobStatusFeed {
    /// A job of the requested type has finished
    pub fn is_done(&self, job_type: &str) -> bool {
        self.jobs
            .iter()
            .any(|job| job.job_type == job_type && job.job_status == JobStatus::Done)
    }

    /// Number of add-node records for `appliance_id` that report failure
    pub fn failed_nodes(&self, appliance_id: &str) -> u32 {
        self.add_nodes
            .iter()
            .filter(|node| {
                node.appliance_id == appliance_id && node.availability == Availability::Failed
            })
            .count() as u32
    }
}

/// Desired configuration of a new appliance
///
/// `body` is the provider-specific request payload; the engine passes it
/// through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplianceSpec {
    pub name: String,
    pub plan: String,
    pub zone: String,
    #[serde(default)]
    pub body: serde_json::Value,
    /// Configuration parameters applied after the appliance becomes ready
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Desired changes to an existing appliance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplianceUpdate {
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Additional nodes joined to a primary appliance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddNodesSpec {
    pub zone: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

/// Desired subnet on an Internet router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub netmask: u8,
    pub next_hop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetUpdate {
    pub next_hop: String,
}

/// Subnet as read back from the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetRecord {
    pub id: String,
    pub internet_id: String,
    pub network_address: String,
    pub netmask: u8,
    pub next_hop: Option<String>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// Internet router as read back from the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternetRecord {
    pub id: String,
    pub name: String,
    pub band_width_mbps: u32,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}
