//! Local record of provisioned resources
//!
//! Manages `.sakuraform/state.json`. The orchestrators never touch it; the
//! CLI records what a workflow returned so later runs know remote ids and
//! the parameters last applied.

use crate::error::{CloudError, Result};
use crate::model::{
    Availability, InstanceStatus, InternetRecord, RemoteApplianceState, SubnetRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".sakuraform";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// A lock older than this is considered abandoned
const STALE_LOCK_HOURS: i64 = 1;

/// Every resource this project manages, keyed by `kind:name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(kind: ResourceKind, name: &str) -> String {
        format!("{}:{}", kind, name)
    }

    /// Insert or replace; `created_at` of an existing entry is kept
    pub fn upsert(&mut self, mut resource: ResourceState) {
        let key = Self::key(resource.kind, &resource.name);
        if let Some(existing) = self.resources.get(&key) {
            resource.created_at = existing.created_at;
        }
        self.resources.insert(key, resource);
        self.updated_at = Utc::now();
    }

    pub fn remove(&mut self, kind: ResourceKind, name: &str) -> Option<ResourceState> {
        let removed = self.resources.remove(&Self::key(kind, name));
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ResourceState> {
        self.resources.get(&Self::key(kind, name))
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceState> {
        self.resources.values().filter(move |r| r.kind == kind)
    }

    /// Subnets whose parent is `internet_id`
    pub fn children_of<'a>(&'a self, internet_id: &'a str) -> impl Iterator<Item = &'a ResourceState> {
        self.resources
            .values()
            .filter(move |r| {
                r.kind == ResourceKind::Subnet && r.parent_id.as_deref() == Some(internet_id)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Nosql,
    Subnet,
    Internet,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Nosql => write!(f, "nosql"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::Internet => write!(f, "internet"),
        }
    }
}

/// One managed resource as last seen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub kind: ResourceKind,
    /// Local name; for subnets and routers this is the remote id
    pub name: String,
    /// Remote id
    pub id: String,
    pub status: ResourceStatus,

    /// Id of the shared parent (subnets only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Parameters last applied successfully
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(kind: ResourceKind, name: impl Into<String>, id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            kind,
            name: name.into(),
            id: id.into(),
            status: ResourceStatus::Unknown,
            parent_id: None,
            parameters: BTreeMap::new(),
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_appliance(
        state: &RemoteApplianceState,
        parameters: &BTreeMap<String, String>,
    ) -> Self {
        let mut resource = Self::new(ResourceKind::Nosql, &state.name, &state.id);
        resource.status = ResourceStatus::from_appliance(state);
        resource.parameters = parameters.clone();
        if let Some(zone) = &state.zone {
            resource.set_attribute("zone", serde_json::json!(zone));
        }
        resource.set_attribute("health", serde_json::json!(state.health_status.to_string()));
        resource
    }

    pub fn from_subnet(record: &SubnetRecord) -> Self {
        let mut resource = Self::new(ResourceKind::Subnet, &record.id, &record.id);
        resource.status = ResourceStatus::Ready;
        resource.parent_id = Some(record.internet_id.clone());
        resource.set_attribute(
            "network",
            serde_json::json!(format!("{}/{}", record.network_address, record.netmask)),
        );
        if let Some(next_hop) = &record.next_hop {
            resource.set_attribute("next_hop", serde_json::json!(next_hop));
        }
        resource
    }

    pub fn from_internet(record: &InternetRecord) -> Self {
        let mut resource = Self::new(ResourceKind::Internet, &record.id, &record.id);
        resource.status = ResourceStatus::Ready;
        resource.set_attribute("display_name", serde_json::json!(record.name));
        resource.set_attribute("band_width_mbps", serde_json::json!(record.band_width_mbps));
        resource
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Provisioned and serving
    Ready,
    /// Exists but its instance is stopped
    Stopped,
    /// Provider reported a failure state
    Failed,
    Unknown,
}

impl ResourceStatus {
    fn from_appliance(state: &RemoteApplianceState) -> Self {
        match (state.availability, state.instance_status) {
            (Availability::Failed, _) => ResourceStatus::Failed,
            (_, InstanceStatus::Down) => ResourceStatus::Stopped,
            (Availability::Available, InstanceStatus::Up) => ResourceStatus::Ready,
            _ => ResourceStatus::Unknown,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Ready => write!(f, "ready"),
            ResourceStatus::Stopped => write!(f, "stopped"),
            ResourceStatus::Failed => write!(f, "failed"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reads and writes the state file of one project directory
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, starting empty");
            return Ok(StateFile::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateFile = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Write `state`, keeping the previous file as a backup
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Load, apply `f`, save, all under the project lock
    pub async fn update<F>(&self, f: F) -> Result<StateFile>
    where
        F: FnOnce(&mut StateFile),
    {
        let lock = self.acquire_lock().await?;
        let mut state = self.load().await?;
        f(&mut state);
        self.save(&state).await?;
        lock.release().await?;
        Ok(state)
    }

    /// Take the project lock so two CLI runs do not interleave writes
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let holder: LockHolder = serde_json::from_str(&content)?;

            let age = Utc::now().signed_duration_since(holder.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::LockError(format!(
                    "State is locked by {} (pid {}) since {}",
                    holder.host, holder.pid, holder.acquired_at
                )));
            }
            tracing::warn!("Taking over stale state lock from {}", holder.host);
        }

        let holder = LockHolder {
            host: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        fs::write(&lock_path, serde_json::to_string_pretty(&holder)?).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockHolder {
    host: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held project lock; removed on release or drop
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path).await?;
            tracing::debug!("Released state lock");
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
