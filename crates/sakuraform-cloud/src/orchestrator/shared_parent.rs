//! Child resources of a shared parent (subnets of an Internet router)

use super::{OperationTimeouts, call, call_optional};
use crate::context::OperationContext;
use crate::error::{Phase, ProvisionError};
use crate::lock::{LockGuard, LockService, NamedMutex};
use crate::model::{InternetRecord, SubnetRecord, SubnetSpec, SubnetUpdate};
use crate::provider::SharedParentApi;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Result<T> = std::result::Result<T, ProvisionError>;

const SUBNET: &str = "Subnet";
const INTERNET: &str = "Internet";

/// Serializes structural mutations of one parent through `L`
///
/// Only the mutating call runs under the lock. The read-back of the
/// affected resource happens after release, so a concurrent reader can
/// briefly observe the parent between the two.
pub struct SharedParentOrchestrator<P, L = NamedMutex> {
    api: P,
    locks: Arc<L>,
    timeouts: OperationTimeouts,
    cancel: CancellationToken,
}

impl<P: SharedParentApi, L: LockService> SharedParentOrchestrator<P, L> {
    pub fn new(api: P, locks: Arc<L>) -> Self {
        Self {
            api,
            locks,
            timeouts: OperationTimeouts::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: OperationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn api(&self) -> &P {
        &self.api
    }

    fn context(&self, timeout: Duration) -> OperationContext {
        OperationContext::new(timeout, self.cancel.child_token())
    }

    async fn lock_parent(
        &self,
        ctx: &OperationContext,
        internet_id: &str,
        resource: &'static str,
        id: &str,
        phase: &Phase,
    ) -> Result<LockGuard> {
        ctx.run(self.locks.acquire(internet_id))
            .await
            .map_err(|err| ProvisionError::new(resource, id, phase.clone(), err))
    }

    /// Add a subnet to `internet_id` and read it back
    pub async fn create_subnet(&self, internet_id: &str, spec: &SubnetSpec) -> Result<SubnetRecord> {
        let ctx = self.context(self.timeouts.create);
        let phase = Phase::AddSubnet;

        let subnet_id = {
            let _guard = self
                .lock_parent(&ctx, internet_id, INTERNET, internet_id, &phase)
                .await?;
            tracing::info!("Adding /{} subnet to Internet[{}]", spec.netmask, internet_id);
            call(
                &ctx,
                INTERNET,
                internet_id,
                phase,
                self.api.add_subnet(internet_id, spec),
            )
            .await?
        };

        call(
            &ctx,
            SUBNET,
            &subnet_id,
            Phase::Read,
            self.api.read_subnet(&subnet_id),
        )
        .await
    }

    /// Change the next hop of a subnet and read it back
    pub async fn update_subnet(
        &self,
        internet_id: &str,
        subnet_id: &str,
        update: &SubnetUpdate,
    ) -> Result<SubnetRecord> {
        let ctx = self.context(self.timeouts.update);
        let phase = Phase::UpdateSubnet;

        {
            let _guard = self
                .lock_parent(&ctx, internet_id, SUBNET, subnet_id, &phase)
                .await?;
            tracing::info!("Updating Subnet[{}] on Internet[{}]", subnet_id, internet_id);
            call(
                &ctx,
                SUBNET,
                subnet_id,
                phase,
                self.api.update_subnet(internet_id, subnet_id, update),
            )
            .await?;
        }

        call(
            &ctx,
            SUBNET,
            subnet_id,
            Phase::Read,
            self.api.read_subnet(subnet_id),
        )
        .await
    }

    /// Remove a subnet; one that is already gone counts as removed
    pub async fn delete_subnet(&self, internet_id: &str, subnet_id: &str) -> Result<()> {
        let ctx = self.context(self.timeouts.subnet_delete);
        let phase = Phase::DeleteSubnet;

        let _guard = self
            .lock_parent(&ctx, internet_id, SUBNET, subnet_id, &phase)
            .await?;
        tracing::info!("Deleting Subnet[{}] from Internet[{}]", subnet_id, internet_id);
        let deleted = call_optional(
            &ctx,
            SUBNET,
            subnet_id,
            phase,
            self.api.delete_subnet(internet_id, subnet_id),
        )
        .await?;

        if deleted.is_none() {
            tracing::info!("Subnet[{}] is already gone", subnet_id);
        }
        Ok(())
    }

    /// Current remote state, `None` when the subnet is gone
    pub async fn read_subnet(&self, subnet_id: &str) -> Result<Option<SubnetRecord>> {
        let ctx = self.context(self.timeouts.read);
        call_optional(
            &ctx,
            SUBNET,
            subnet_id,
            Phase::Read,
            self.api.read_subnet(subnet_id),
        )
        .await
    }

    /// Change the router bandwidth. The provider replaces the router, so
    /// the returned record carries a new id.
    pub async fn update_bandwidth(
        &self,
        internet_id: &str,
        band_width_mbps: u32,
    ) -> Result<InternetRecord> {
        let ctx = self.context(self.timeouts.update);
        let phase = Phase::UpdateBandwidth;

        let new_id = {
            let _guard = self
                .lock_parent(&ctx, internet_id, INTERNET, internet_id, &phase)
                .await?;
            tracing::info!(
                "Changing bandwidth of Internet[{}] to {} Mbps",
                internet_id,
                band_width_mbps
            );
            call(
                &ctx,
                INTERNET,
                internet_id,
                phase,
                self.api.update_bandwidth(internet_id, band_width_mbps),
            )
            .await?
        };

        if new_id != internet_id {
            tracing::info!("Internet[{}] was replaced by Internet[{}]", internet_id, new_id);
        }

        call(
            &ctx,
            INTERNET,
            &new_id,
            Phase::Read,
            self.api.read_internet(&new_id),
        )
        .await
    }

    /// Delete the router itself under its own key
    pub async fn delete_internet(&self, internet_id: &str) -> Result<()> {
        let ctx = self.context(self.timeouts.delete);
        let phase = Phase::DeleteInternet;

        let _guard = self
            .lock_parent(&ctx, internet_id, INTERNET, internet_id, &phase)
            .await?;
        tracing::info!("Deleting Internet[{}]", internet_id);
        if call_optional(
            &ctx,
            INTERNET,
            internet_id,
            phase,
            self.api.delete_internet(internet_id),
        )
        .await?
        .is_none()
        {
            tracing::info!("Internet[{}] is already gone", internet_id);
        }
        Ok(())
    }
}
