//! NoSQL database appliance
//!
//! Maps the appliance endpoints onto [`ApplianceApi`]. Wire DTOs stay in
//! this module; the engine only sees `sakuraform_cloud::model` types.

use crate::client::{SakuraClient, flexible_id};
use crate::error::SakuraError;
use async_trait::async_trait;
use reqwest::Method;
use sakuraform_cloud::model::{
    AddNodeRecord, AddNodesSpec, ApplianceSpec, ApplianceUpdate, Availability, HealthStatus,
    InstanceStatus, JobRecord, JobStatus, JobStatusFeed, RemoteApplianceState,
};
use sakuraform_cloud::{ApplianceApi, CloudError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

type CloudResult<T> = sakuraform_cloud::Result<T>;

const APPLIANCE_CLASS: &str = "nosql";

/// NoSQL appliances of one zone
pub struct NosqlApi {
    client: SakuraClient,
}

impl NosqlApi {
    pub fn new(client: SakuraClient) -> Self {
        Self { client }
    }

    async fn list_parameters(&self, id: &str) -> Result<Vec<ParameterDto>, SakuraError> {
        let response: ParametersEnvelope = self
            .client
            .get(&format!("appliance/{}/nosql/parameters", id))
            .await?;
        Ok(response.nosql.parameters)
    }
}

#[async_trait]
impl ApplianceApi for NosqlApi {
    async fn create(&self, spec: &ApplianceSpec) -> CloudResult<String> {
        let body = json!({ "Appliance": create_request(spec) });
        let response: ApplianceEnvelope = self.client.post("appliance", &body).await?;
        Ok(response.appliance.id)
    }

    async fn read(&self, id: &str) -> CloudResult<RemoteApplianceState> {
        let response: ApplianceEnvelope = self.client.get(&format!("appliance/{}", id)).await?;
        Ok(response.appliance.into())
    }

    async fn read_health(&self, id: &str) -> CloudResult<HealthStatus> {
        let response: HealthEnvelope = self
            .client
            .get(&format!("appliance/{}/nosql/health", id))
            .await?;
        Ok(HealthStatus::parse(&response.nosql.status))
    }

    async fn read_job_status(&self, id: &str) -> CloudResult<JobStatusFeed> {
        let response: StatusEnvelope = self
            .client
            .get(&format!("appliance/{}/nosql/status", id))
            .await?;
        Ok(response.appliance.into())
    }

    async fn update(&self, id: &str, update: &ApplianceUpdate) -> CloudResult<()> {
        let body = json!({ "Appliance": update.body });
        self.client
            .send(Method::PUT, &format!("appliance/{}", id), Some(&body))
            .await?;
        Ok(())
    }

    async fn apply_changes(&self, id: &str) -> CloudResult<()> {
        self.client
            .send::<()>(Method::PUT, &format!("appliance/{}/config", id), None)
            .await?;
        Ok(())
    }

    async fn set_parameters(
        &self,
        id: &str,
        parameters: &BTreeMap<String, String>,
    ) -> CloudResult<()> {
        let available = self.list_parameters(id).await?;
        let settings = resolve_parameters(&available, parameters);
        if settings.is_empty() {
            return Err(CloudError::InvalidConfig(format!(
                "none of the parameters {:?} are known to appliance {}",
                parameters.keys().collect::<Vec<_>>(),
                id
            )));
        }

        let body = json!({ "Nosql": { "Parameters": settings } });
        self.client
            .send(
                Method::PUT,
                &format!("appliance/{}/nosql/parameters", id),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> CloudResult<()> {
        self.client
            .send::<()>(Method::DELETE, &format!("appliance/{}/power", id), None)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CloudResult<()> {
        self.client
            .send::<()>(Method::DELETE, &format!("appliance/{}", id), None)
            .await?;
        Ok(())
    }

    async fn add_nodes(&self, primary_id: &str, spec: &AddNodesSpec) -> CloudResult<String> {
        let mut appliance = object_of(&spec.body);
        set_remark_zone(&mut appliance, &spec.zone);

        let body = json!({ "Appliance": Value::Object(appliance) });
        let response: ApplianceEnvelope = self
            .client
            .post(&format!("appliance/{}/nosql/nodes", primary_id), &body)
            .await?;
        Ok(response.appliance.id)
    }
}

/// Request body of a new appliance: the user payload plus the fields the
/// engine owns
fn create_request(spec: &ApplianceSpec) -> Value {
    let mut appliance = object_of(&spec.body);
    appliance.insert("Class".to_string(), json!(APPLIANCE_CLASS));
    appliance.insert("Name".to_string(), json!(spec.name));
    appliance.insert("Plan".to_string(), json!({ "ID": spec.plan }));
    set_remark_zone(&mut appliance, &spec.zone);
    Value::Object(appliance)
}

fn object_of(body: &Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn set_remark_zone(appliance: &mut Map<String, Value>, zone: &str) {
    let remark = appliance
        .entry("Remark")
        .or_insert_with(|| json!({}));
    if !remark.is_object() {
        *remark = json!({});
    }
    if let Value::Object(remark) = remark {
        let nosql = remark.entry("Nosql").or_insert_with(|| json!({}));
        if !nosql.is_object() {
            *nosql = json!({});
        }
        if let Value::Object(nosql) = nosql {
            nosql.insert("Zone".to_string(), json!(zone));
        }
    }
}

/// Map setting names to setting-item ids. Names the appliance does not
/// know are dropped with a warning.
fn resolve_parameters(
    available: &[ParameterDto],
    wanted: &BTreeMap<String, String>,
) -> Vec<PutParameter> {
    let mut settings = Vec::with_capacity(wanted.len());
    for (name, value) in wanted {
        match available.iter().find(|p| &p.setting_item == name) {
            Some(param) => settings.push(PutParameter {
                setting_item_id: param.setting_item_id.clone(),
                setting_value: value.clone(),
            }),
            None => tracing::warn!("Unknown NoSQL parameter ignored: {}", name),
        }
    }
    settings
}

// API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplianceEnvelope {
    appliance: ApplianceDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplianceDto {
    #[serde(rename = "ID", deserialize_with = "flexible_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    availability: String,
    #[serde(default)]
    instance: Option<InstanceDto>,
    #[serde(default)]
    remark: Option<RemarkDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceDto {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemarkDto {
    #[serde(default)]
    nosql: Option<RemarkNosqlDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemarkNosqlDto {
    #[serde(default)]
    zone: Option<String>,
}

impl From<ApplianceDto> for RemoteApplianceState {
    fn from(dto: ApplianceDto) -> Self {
        let instance_status = dto
            .instance
            .as_ref()
            .map(|i| InstanceStatus::parse(&i.status))
            .unwrap_or(InstanceStatus::Unknown);
        let zone = dto.remark.and_then(|r| r.nosql).and_then(|n| n.zone);

        Self {
            id: dto.id,
            name: dto.name,
            zone,
            availability: Availability::parse(&dto.availability),
            instance_status,
            health_status: HealthStatus::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEnvelope {
    nosql: HealthDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthDto {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusEnvelope {
    appliance: StatusDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusDto {
    #[serde(default)]
    jobs: Vec<JobDto>,
    #[serde(default)]
    add_nodes: Vec<AddNodeDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobDto {
    job_type: String,
    job_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddNodeDto {
    #[serde(rename = "ApplianceID", deserialize_with = "flexible_id")]
    appliance_id: String,
    #[serde(default)]
    availability: String,
}

impl From<StatusDto> for JobStatusFeed {
    fn from(dto: StatusDto) -> Self {
        Self {
            jobs: dto
                .jobs
                .into_iter()
                .filter_map(|job| {
                    JobStatus::parse(&job.job_status).map(|status| JobRecord::new(job.job_type, status))
                })
                .collect(),
            add_nodes: dto
                .add_nodes
                .into_iter()
                .map(|node| AddNodeRecord {
                    appliance_id: node.appliance_id,
                    availability: Availability::parse(&node.availability),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParametersEnvelope {
    nosql: ParametersDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParametersDto {
    #[serde(default)]
    parameters: Vec<ParameterDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterDto {
    setting_item: String,
    #[serde(deserialize_with = "flexible_id")]
    setting_item_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutParameter {
    setting_item_id: String,
    setting_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appliance_dto_into_state() {
        let envelope: ApplianceEnvelope = serde_json::from_value(json!({
            "Appliance": {
                "ID": "113700000001",
                "Name": "db01",
                "Availability": "available",
                "Instance": { "Status": "up" },
                "Remark": { "Nosql": { "Zone": "tk1b" } }
            }
        }))
        .unwrap();

        let state: RemoteApplianceState = envelope.appliance.into();
        assert_eq!(state.id, "113700000001");
        assert_eq!(state.availability, Availability::Available);
        assert_eq!(state.instance_status, InstanceStatus::Up);
        assert_eq!(state.zone.as_deref(), Some("tk1b"));
    }

    #[test]
    fn test_appliance_without_instance_is_unknown() {
        let dto: ApplianceDto = serde_json::from_value(json!({
            "ID": 113700000001u64,
            "Availability": "migrating"
        }))
        .unwrap();

        let state: RemoteApplianceState = dto.into();
        assert_eq!(state.id, "113700000001");
        assert_eq!(state.availability, Availability::Migrating);
        assert_eq!(state.instance_status, InstanceStatus::Unknown);
    }

    #[test]
    fn test_status_feed_conversion() {
        let dto: StatusDto = serde_json::from_value(json!({
            "Jobs": [
                { "JobType": "SetParameter", "JobStatus": "Done" },
                { "JobType": "Update", "JobStatus": "Queued" }
            ],
            "AddNodes": [
                { "ApplianceID": "113700000002", "Availability": "failed" }
            ]
        }))
        .unwrap();

        let feed: JobStatusFeed = dto.into();
        assert!(feed.is_done("SetParameter"));
        // unrecognized job status is dropped
        assert_eq!(feed.jobs.len(), 1);
        assert_eq!(feed.failed_nodes("113700000002"), 1);
    }

    #[test]
    fn test_resolve_parameters_by_name() {
        let available = vec![
            ParameterDto {
                setting_item: "max_connections".to_string(),
                setting_item_id: "1".to_string(),
            },
            ParameterDto {
                setting_item: "gc_grace_seconds".to_string(),
                setting_item_id: "2".to_string(),
            },
        ];
        let mut wanted = BTreeMap::new();
        wanted.insert("gc_grace_seconds".to_string(), "3600".to_string());
        wanted.insert("no_such_setting".to_string(), "1".to_string());

        let settings = resolve_parameters(&available, &wanted);
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].setting_item_id, "2");
        assert_eq!(settings[0].setting_value, "3600");
    }

    #[test]
    fn test_create_request_keeps_user_payload() {
        let spec = ApplianceSpec {
            name: "db01".to_string(),
            plan: "100GB".to_string(),
            zone: "tk1b".to_string(),
            body: json!({
                "Description": "primary",
                "Remark": { "Nosql": { "Version": "4.1.9" } }
            }),
            parameters: BTreeMap::new(),
        };

        let request = create_request(&spec);
        assert_eq!(request["Class"], "nosql");
        assert_eq!(request["Name"], "db01");
        assert_eq!(request["Plan"]["ID"], "100GB");
        assert_eq!(request["Description"], "primary");
        assert_eq!(request["Remark"]["Nosql"]["Version"], "4.1.9");
        assert_eq!(request["Remark"]["Nosql"]["Zone"], "tk1b");
    }
}
