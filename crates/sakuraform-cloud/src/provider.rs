//! Provider API traits consumed by the orchestrators
//!
//! Adapters (e.g. `sakuraform-cloud-sakura`) implement these against a real
//! API; tests implement them with scripted fakes. A missing resource must be
//! reported as [`CloudError::ResourceNotFound`](crate::CloudError).

use crate::error::Result;
use crate::model::{
    AddNodesSpec, ApplianceSpec, ApplianceUpdate, HealthStatus, InternetRecord, JobStatusFeed,
    RemoteApplianceState, SubnetRecord, SubnetSpec, SubnetUpdate,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Managed appliance API (NoSQL database appliance and similar)
#[async_trait]
pub trait ApplianceApi: Send + Sync {
    /// Returns the id of the created appliance
    async fn create(&self, spec: &ApplianceSpec) -> Result<String>;

    async fn read(&self, id: &str) -> Result<RemoteApplianceState>;

    async fn read_health(&self, id: &str) -> Result<HealthStatus>;

    async fn read_job_status(&self, id: &str) -> Result<JobStatusFeed>;

    async fn update(&self, id: &str, update: &ApplianceUpdate) -> Result<()>;

    async fn apply_changes(&self, id: &str) -> Result<()>;

    /// Set configuration parameters by setting name
    async fn set_parameters(&self, id: &str, parameters: &BTreeMap<String, String>) -> Result<()>;

    async fn stop(&self, id: &str) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Join additional nodes to `primary_id`; returns the id of the node group
    async fn add_nodes(&self, primary_id: &str, spec: &AddNodesSpec) -> Result<String>;
}

/// API of a parent resource whose child list is shared between
/// independently managed resources (Internet router and its subnets)
#[async_trait]
pub trait SharedParentApi: Send + Sync {
    /// Returns the id of the new subnet
    async fn add_subnet(&self, internet_id: &str, spec: &SubnetSpec) -> Result<String>;

    async fn update_subnet(
        &self,
        internet_id: &str,
        subnet_id: &str,
        update: &SubnetUpdate,
    ) -> Result<()>;

    async fn delete_subnet(&self, internet_id: &str, subnet_id: &str) -> Result<()>;

    async fn read_subnet(&self, subnet_id: &str) -> Result<SubnetRecord>;

    async fn read_internet(&self, internet_id: &str) -> Result<InternetRecord>;

    /// Changing the bandwidth replaces the router; returns the new id
    async fn update_bandwidth(&self, internet_id: &str, band_width_mbps: u32) -> Result<String>;

    async fn delete_internet(&self, internet_id: &str) -> Result<()>;
}

#[async_trait]
impl<T: ApplianceApi + ?Sized> ApplianceApi for Arc<T> {
    async fn create(&self, spec: &ApplianceSpec) -> Result<String> {
        (**self).create(spec).await
    }

    async fn read(&self, id: &str) -> Result<RemoteApplianceState> {
        (**self).read(id).await
    }

    async fn read_health(&self, id: &str) -> Result<HealthStatus> {
        (**self).read_health(id).await
    }

    async fn read_job_status(&self, id: &str) -> Result<JobStatusFeed> {
        (**self).read_job_status(id).await
    }

    async fn update(&self, id: &str, update: &ApplianceUpdate) -> Result<()> {
        (**self).update(id, update).await
    }

    async fn apply_changes(&self, id: &str) -> Result<()> {
        (**self).apply_changes(id).await
    }

    async fn set_parameters(&self, id: &str, parameters: &BTreeMap<String, String>) -> Result<()> {
        (**self).set_parameters(id, parameters).await
    }

    async fn stop(&self, id: &str) -> Result<()> {
        (**self).stop(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id).await
    }

    async fn add_nodes(&self, primary_id: &str, spec: &AddNodesSpec) -> Result<String> {
        (**self).add_nodes(primary_id, spec).await
    }
}

#[async_trait]
impl<T: SharedParentApi + ?Sized> SharedParentApi for Arc<T> {
    async fn add_subnet(&self, internet_id: &str, spec: &SubnetSpec) -> Result<String> {
        (**self).add_subnet(internet_id, spec).await
    }

    async fn update_subnet(
        &self,
        internet_id: &str,
        subnet_id: &str,
        update: &SubnetUpdate,
    ) -> Result<()> {
        (**self).update_subnet(internet_id, subnet_id, update).await
    }

    async fn delete_subnet(&self, internet_id: &str, subnet_id: &str) -> Result<()> {
        (**self).delete_subnet(internet_id, subnet_id).await
    }

    async fn read_subnet(&self, subnet_id: &str) -> Result<SubnetRecord> {
        (**self).read_subnet(subnet_id).await
    }

    async fn read_internet(&self, internet_id: &str) -> Result<InternetRecord> {
        (**self).read_internet(internet_id).await
    }

    async fn update_bandwidth(&self, internet_id: &str, band_width_mbps: u32) -> Result<String> {
        (**self).update_bandwidth(internet_id, band_width_mbps).await
    }

    async fn delete_internet(&self, internet_id: &str) -> Result<()> {
        (**self).delete_internet(internet_id).await
    }
}
