//! Managed appliance lifecycle

use super::{OperationTimeouts, PollPolicies, call, call_optional};
use crate::context::OperationContext;
use crate::error::{Phase, PollError, ProvisionError};
use crate::model::{
    AddNodesSpec, ApplianceSpec, ApplianceUpdate, InstanceStatus, JOB_ADD_NODE,
    JOB_SET_PARAMETER, JOB_UPDATE, RemoteApplianceState,
};
use crate::poller::{wait_until_down, wait_until_job_done, wait_until_ready};
use crate::provider::ApplianceApi;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Result<T> = std::result::Result<T, ProvisionError>;

/// Drives an appliance through create/update/delete
///
/// No locking: an appliance has no shared parent.
pub struct ApplianceOrchestrator<A> {
    api: A,
    resource: &'static str,
    policies: PollPolicies,
    timeouts: OperationTimeouts,
    cancel: CancellationToken,
}

impl<A: ApplianceApi> ApplianceOrchestrator<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            resource: "Appliance",
            policies: PollPolicies::default(),
            timeouts: OperationTimeouts::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Name used in errors and logs, e.g. "NoSQL"
    pub fn with_resource_name(mut self, resource: &'static str) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_policies(mut self, policies: PollPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_timeouts(mut self, timeouts: OperationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Cancelling `token` aborts every running and future operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn context(&self, timeout: Duration) -> OperationContext {
        OperationContext::new(timeout, self.cancel.child_token())
    }

    fn waited(&self, id: &str, phase: Phase) -> impl FnOnce(PollError) -> ProvisionError + '_ {
        let id = id.to_string();
        move |err| ProvisionError::new(self.resource, id, phase, err)
    }

    /// Create, wait until ready, apply parameters, read back
    pub async fn create(&self, spec: &ApplianceSpec) -> Result<RemoteApplianceState> {
        let ctx = self.context(self.timeouts.create);

        tracing::info!("Creating {} {}", self.resource, spec.name);
        let id = call(
            &ctx,
            self.resource,
            &spec.name,
            Phase::Create,
            self.api.create(spec),
        )
        .await?;

        tracing::info!("{}[{}] created, waiting for ready", self.resource, id);
        wait_until_ready(&self.api, &id, self.policies.readiness, &ctx)
            .await
            .map_err(self.waited(&id, Phase::WaitReady))?;

        if !spec.parameters.is_empty() {
            self.apply_parameters(&ctx, &id, &spec.parameters).await?;
        }

        call(&ctx, self.resource, &id, Phase::Read, self.api.read(&id)).await
    }

    /// Update, apply changes, re-apply parameters when they changed
    ///
    /// `previous_parameters` are the parameters currently recorded in state.
    pub async fn update(
        &self,
        id: &str,
        update: &ApplianceUpdate,
        previous_parameters: &BTreeMap<String, String>,
    ) -> Result<RemoteApplianceState> {
        let ctx = self.context(self.timeouts.update);

        tracing::info!("Updating {}[{}]", self.resource, id);
        call(
            &ctx,
            self.resource,
            id,
            Phase::Update,
            self.api.update(id, update),
        )
        .await?;

        call(
            &ctx,
            self.resource,
            id,
            Phase::ApplyChanges,
            self.api.apply_changes(id),
        )
        .await?;

        wait_until_job_done(&self.api, id, JOB_UPDATE, self.policies.job, &ctx)
            .await
            .map_err(self.waited(id, Phase::WaitJob(JOB_UPDATE.to_string())))?;

        if !update.parameters.is_empty() && update.parameters != *previous_parameters {
            self.apply_parameters(&ctx, id, &update.parameters).await?;
        }

        call(&ctx, self.resource, id, Phase::Read, self.api.read(id)).await
    }

    /// Stop if running, wait until down, delete
    ///
    /// An appliance that no longer exists counts as deleted.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let ctx = self.context(self.timeouts.delete);

        let Some(state) =
            call_optional(&ctx, self.resource, id, Phase::Read, self.api.read(id)).await?
        else {
            tracing::info!("{}[{}] is already gone", self.resource, id);
            return Ok(());
        };

        if state.instance_status != InstanceStatus::Down {
            tracing::info!("Stopping {}[{}]", self.resource, id);
            call(&ctx, self.resource, id, Phase::Stop, self.api.stop(id)).await?;

            wait_until_down(&self.api, id, self.policies.down, &ctx)
                .await
                .map_err(self.waited(id, Phase::WaitDown))?;
        }

        tracing::info!("Deleting {}[{}]", self.resource, id);
        call(&ctx, self.resource, id, Phase::Delete, self.api.delete(id)).await
    }

    /// Join additional nodes to `primary_id` and wait until they serve
    pub async fn add_nodes(
        &self,
        primary_id: &str,
        spec: &AddNodesSpec,
    ) -> Result<RemoteApplianceState> {
        let ctx = self.context(self.timeouts.create);

        tracing::info!("Adding nodes to {}[{}]", self.resource, primary_id);
        let id = call(
            &ctx,
            self.resource,
            primary_id,
            Phase::AddNodes,
            self.api.add_nodes(primary_id, spec),
        )
        .await?;

        wait_until_ready(&self.api, &id, self.policies.readiness, &ctx)
            .await
            .map_err(self.waited(&id, Phase::WaitReady))?;

        wait_until_job_done(&self.api, &id, JOB_ADD_NODE, self.policies.job, &ctx)
            .await
            .map_err(self.waited(&id, Phase::WaitJob(JOB_ADD_NODE.to_string())))?;

        call(&ctx, self.resource, &id, Phase::Read, self.api.read(&id)).await
    }

    /// Current remote state, `None` when the appliance is gone
    pub async fn read(&self, id: &str) -> Result<Option<RemoteApplianceState>> {
        let ctx = self.context(self.timeouts.read);
        call_optional(&ctx, self.resource, id, Phase::Read, self.api.read(id)).await
    }

    async fn apply_parameters(
        &self,
        ctx: &OperationContext,
        id: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<()> {
        tracing::info!(
            "Setting {} parameter(s) on {}[{}]",
            parameters.len(),
            self.resource,
            id
        );
        call(
            ctx,
            self.resource,
            id,
            Phase::SetParameters,
            self.api.set_parameters(id, parameters),
        )
        .await?;

        wait_until_job_done(&self.api, id, JOB_SET_PARAMETER, self.policies.job, ctx)
            .await
            .map_err(self.waited(id, Phase::WaitJob(JOB_SET_PARAMETER.to_string())))
    }
}
