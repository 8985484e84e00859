#![allow(dead_code)]

use async_trait::async_trait;
use sakuraform_cloud::lock::{LockGuard, LockService, NamedMutex};
use sakuraform_cloud::model::{
    AddNodeRecord, AddNodesSpec, ApplianceSpec, ApplianceUpdate, Availability, HealthStatus,
    InstanceStatus, InternetRecord, JobRecord, JobStatus, JobStatusFeed, RemoteApplianceState,
    SubnetRecord, SubnetSpec, SubnetUpdate,
};
use sakuraform_cloud::{ApplianceApi, CloudError, Result, SharedParentApi};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Err(String),
    NotFound,
}

/// Answers in order; the last one repeats forever
#[derive(Debug)]
pub struct Script<T> {
    steps: Mutex<VecDeque<Reply<T>>>,
}

impl<T: Clone> Script<T> {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, reply: Reply<T>) -> &Self {
        self.steps.lock().unwrap().push_back(reply);
        self
    }

    pub fn ok(&self, value: T) -> &Self {
        self.push(Reply::Ok(value))
    }

    pub fn err(&self, message: &str) -> &Self {
        self.push(Reply::Err(message.to_string()))
    }

    pub fn times(&self, reply: Reply<T>, n: usize) -> &Self {
        for _ in 0..n {
            self.push(reply.clone());
        }
        self
    }

    fn next(&self, id: &str) -> Result<T> {
        let mut steps = self.steps.lock().unwrap();
        let reply = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        };
        match reply {
            Some(Reply::Ok(value)) => Ok(value),
            Some(Reply::Err(message)) => Err(CloudError::ApiError(message)),
            Some(Reply::NotFound) | None => Err(CloudError::ResourceNotFound(id.to_string())),
        }
    }
}

pub fn appliance(
    id: &str,
    availability: Availability,
    instance_status: InstanceStatus,
) -> RemoteApplianceState {
    RemoteApplianceState {
        id: id.to_string(),
        name: "db01".to_string(),
        zone: Some("tk1b".to_string()),
        availability,
        instance_status,
        health_status: HealthStatus::Unknown,
    }
}

pub fn running(id: &str) -> RemoteApplianceState {
    appliance(id, Availability::Available, InstanceStatus::Up)
}

pub fn jobs(records: &[(&str, JobStatus)]) -> JobStatusFeed {
    JobStatusFeed {
        add_nodes: vec![],
        jobs: records
            .iter()
            .map(|(job_type, status)| JobRecord::new(*job_type, *status))
            .collect(),
    }
}

pub fn failed_nodes(appliance_id: &str, n: usize) -> Vec<AddNodeRecord> {
    (0..n)
        .map(|_| AddNodeRecord {
            appliance_id: appliance_id.to_string(),
            availability: Availability::Failed,
        })
        .collect()
}

/// Scripted appliance API that records every call by method name
pub struct FakeAppliance {
    pub reads: Script<RemoteApplianceState>,
    pub health: Script<HealthStatus>,
    pub job_feed: Script<JobStatusFeed>,
    pub created_id: String,
    pub node_group_id: String,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeAppliance {
    pub fn new() -> Self {
        Self {
            reads: Script::new(),
            health: Script::new(),
            job_feed: Script::new(),
            created_id: "113700000001".to_string(),
            node_group_id: "113700000002".to_string(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make a mutating call fail with an API error
    pub fn fail_on(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == method).count()
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(method);
        if self.failing.lock().unwrap().contains(method) {
            return Err(CloudError::ApiError(format!("{} rejected", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl ApplianceApi for FakeAppliance {
    async fn create(&self, _spec: &ApplianceSpec) -> Result<String> {
        self.record("create")?;
        Ok(self.created_id.clone())
    }

    async fn read(&self, id: &str) -> Result<RemoteApplianceState> {
        self.record("read")?;
        self.reads.next(id)
    }

    async fn read_health(&self, id: &str) -> Result<HealthStatus> {
        self.record("read_health")?;
        self.health.next(id)
    }

    async fn read_job_status(&self, id: &str) -> Result<JobStatusFeed> {
        self.record("read_job_status")?;
        self.job_feed.next(id)
    }

    async fn update(&self, _id: &str, _update: &ApplianceUpdate) -> Result<()> {
        self.record("update")
    }

    async fn apply_changes(&self, _id: &str) -> Result<()> {
        self.record("apply_changes")
    }

    async fn set_parameters(&self, _id: &str, _parameters: &BTreeMap<String, String>) -> Result<()> {
        self.record("set_parameters")
    }

    async fn stop(&self, _id: &str) -> Result<()> {
        self.record("stop")
    }

    async fn delete(&self, _id: &str) -> Result<()> {
        self.record("delete")
    }

    async fn add_nodes(&self, _primary_id: &str, _spec: &AddNodesSpec) -> Result<String> {
        self.record("add_nodes")?;
        Ok(self.node_group_id.clone())
    }
}

/// Shared event log used to check ordering across the lock and the API
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// In-memory Internet router with its subnets
///
/// `add_subnet` holds for `mutation_delay` and tracks how many mutations of
/// the same router are in flight at once.
pub struct FakeInternet {
    pub mutation_delay: Duration,
    pub log: EventLog,
    subnets: Mutex<HashMap<String, SubnetRecord>>,
    routers: Mutex<HashMap<String, InternetRecord>>,
    next_id: AtomicU64,
    in_flight: Mutex<HashMap<String, u32>>,
    max_in_flight: AtomicU32,
}

impl FakeInternet {
    pub fn new(log: EventLog) -> Self {
        Self {
            mutation_delay: Duration::from_secs(3),
            log,
            subnets: Mutex::new(HashMap::new()),
            routers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(113700000100),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub fn with_router(self, id: &str, band_width_mbps: u32) -> Self {
        self.routers.lock().unwrap().insert(
            id.to_string(),
            InternetRecord {
                id: id.to_string(),
                name: "router01".to_string(),
                band_width_mbps,
                subnet_ids: vec![],
            },
        );
        self
    }

    /// Highest number of concurrent mutations seen on any single router
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn subnet_count(&self) -> usize {
        self.subnets.lock().unwrap().len()
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    async fn mutate(&self, internet_id: &str) {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let n = in_flight.entry(internet_id.to_string()).or_default();
            *n += 1;
            self.max_in_flight.fetch_max(*n, Ordering::SeqCst);
        }
        tokio::time::sleep(self.mutation_delay).await;
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(n) = in_flight.get_mut(internet_id) {
            *n -= 1;
        }
    }
}

#[async_trait]
impl SharedParentApi for FakeInternet {
    async fn add_subnet(&self, internet_id: &str, spec: &SubnetSpec) -> Result<String> {
        self.log.push(format!("add_subnet {}", internet_id));
        self.mutate(internet_id).await;

        let id = self.next_id();
        self.subnets.lock().unwrap().insert(
            id.clone(),
            SubnetRecord {
                id: id.clone(),
                internet_id: internet_id.to_string(),
                network_address: "203.0.113.16".to_string(),
                netmask: spec.netmask,
                next_hop: Some(spec.next_hop.clone()),
                ip_addresses: vec![],
            },
        );
        if let Some(router) = self.routers.lock().unwrap().get_mut(internet_id) {
            router.subnet_ids.push(id.clone());
        }
        Ok(id)
    }

    async fn update_subnet(
        &self,
        internet_id: &str,
        subnet_id: &str,
        update: &SubnetUpdate,
    ) -> Result<()> {
        self.log.push(format!("update_subnet {}", subnet_id));
        self.mutate(internet_id).await;

        let mut subnets = self.subnets.lock().unwrap();
        let subnet = subnets
            .get_mut(subnet_id)
            .ok_or_else(|| CloudError::ResourceNotFound(subnet_id.to_string()))?;
        subnet.next_hop = Some(update.next_hop.clone());
        Ok(())
    }

    async fn delete_subnet(&self, internet_id: &str, subnet_id: &str) -> Result<()> {
        self.log.push(format!("delete_subnet {}", subnet_id));
        self.mutate(internet_id).await;

        self.subnets
            .lock()
            .unwrap()
            .remove(subnet_id)
            .map(|_| ())
            .ok_or_else(|| CloudError::ResourceNotFound(subnet_id.to_string()))
    }

    async fn read_subnet(&self, subnet_id: &str) -> Result<SubnetRecord> {
        self.log.push(format!("read_subnet {}", subnet_id));
        self.subnets
            .lock()
            .unwrap()
            .get(subnet_id)
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(subnet_id.to_string()))
    }

    async fn read_internet(&self, internet_id: &str) -> Result<InternetRecord> {
        self.log.push(format!("read_internet {}", internet_id));
        self.routers
            .lock()
            .unwrap()
            .get(internet_id)
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(internet_id.to_string()))
    }

    async fn update_bandwidth(&self, internet_id: &str, band_width_mbps: u32) -> Result<String> {
        self.log.push(format!("update_bandwidth {}", internet_id));
        self.mutate(internet_id).await;

        let mut routers = self.routers.lock().unwrap();
        let mut router = routers
            .remove(internet_id)
            .ok_or_else(|| CloudError::ResourceNotFound(internet_id.to_string()))?;
        let new_id = self.next_id();
        router.id = new_id.clone();
        router.band_width_mbps = band_width_mbps;
        routers.insert(new_id.clone(), router);
        Ok(new_id)
    }

    async fn delete_internet(&self, internet_id: &str) -> Result<()> {
        self.log.push(format!("delete_internet {}", internet_id));
        self.routers
            .lock()
            .unwrap()
            .remove(internet_id)
            .map(|_| ())
            .ok_or_else(|| CloudError::ResourceNotFound(internet_id.to_string()))
    }
}

/// Lock service that writes acquire/release into the shared event log
pub struct RecordingLocks {
    inner: NamedMutex,
    log: EventLog,
}

impl RecordingLocks {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: NamedMutex::new(),
            log,
        }
    }
}

struct LoggedRelease {
    _guard: LockGuard,
    key: String,
    log: EventLog,
}

impl Drop for LoggedRelease {
    fn drop(&mut self) {
        self.log.push(format!("unlock {}", self.key));
    }
}

#[async_trait]
impl LockService for RecordingLocks {
    async fn acquire(&self, key: &str) -> LockGuard {
        let guard = self.inner.acquire(key).await;
        self.log.push(format!("lock {}", key));
        LockGuard::new(
            key,
            LoggedRelease {
                _guard: guard,
                key: key.to_string(),
                log: self.log.clone(),
            },
        )
    }
}
