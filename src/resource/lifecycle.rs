//! VM resource lifecycle
//!
//! Create/Read/Update/Delete/Import for a single `virtual_machine`
//! resource, implemented once over any [`VmGateway`].

use crate::api::client::{DspcClient, VmGateway};
use crate::api::http::CallContext;
use crate::api::types::VirtualMachine;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Locally tracked representation of one remote VM.
///
/// The API has no separate identifier, so `id` is always the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    pub id: String,
    pub name: String,
}

impl VmRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
        }
    }
}

impl From<VirtualMachine> for VmRecord {
    fn from(vm: VirtualMachine) -> Self {
        Self::new(vm.name)
    }
}

/// Result of refreshing a tracked record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Still exists; carries the refreshed record
    Present(VmRecord),
    /// Deleted out of band; drop it from tracking
    Gone,
}

/// Full lifecycle view over the VM capability set
#[derive(Debug, Clone)]
pub struct VirtualMachineResource<G = DspcClient> {
    gateway: G,
}

impl<G: VmGateway> VirtualMachineResource<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Create a VM. The remote's echoed name becomes the record's identity.
    pub async fn create(&self, ctx: &CallContext, name: &str) -> Result<VmRecord> {
        let vm = self.gateway.create_vm(ctx, name).await?;
        tracing::info!("Created VM '{}'", vm.name);
        Ok(VmRecord::from(vm))
    }

    /// Refresh `current` from the remote listing.
    ///
    /// Only a not-found result reports [`ReadOutcome::Gone`]; every other
    /// failure is returned as an error so tracked state is left alone.
    pub async fn read(&self, ctx: &CallContext, current: &VmRecord) -> Result<ReadOutcome> {
        match self.gateway.get_vm(ctx, &current.name).await {
            Ok(vm) => Ok(ReadOutcome::Present(VmRecord::from(vm))),
            Err(e) if e.is_not_found() => {
                tracing::warn!("VM '{}' no longer exists remotely, dropping it", current.name);
                Ok(ReadOutcome::Gone)
            }
            Err(e) => Err(e),
        }
    }

    /// Always fails without touching the network: the API cannot update
    /// a VM, so any change must be planned as destroy and recreate.
    pub fn update(&self, current: &VmRecord, desired: &str) -> Result<VmRecord> {
        tracing::debug!(
            "Rejecting in-place update of '{}' to '{}'",
            current.name,
            desired
        );
        Err(Error::UpdateNotSupported)
    }

    pub async fn delete(&self, ctx: &CallContext, current: &VmRecord) -> Result<()> {
        self.gateway.delete_vm(ctx, &current.name).await?;
        tracing::info!("Deleted VM '{}'", current.name);
        Ok(())
    }

    /// Import an existing VM, treating `id` as its name.
    pub async fn import(&self, ctx: &CallContext, id: &str) -> Result<VmRecord> {
        let vm = self.gateway.get_vm(ctx, id).await?;
        tracing::info!("Imported VM '{}'", vm.name);
        Ok(VmRecord::from(vm))
    }

    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<VmRecord>> {
        let vms = self.gateway.list_vms(ctx).await?;
        Ok(vms.into_iter().map(VmRecord::from).collect())
    }

    /// Read-only view over the same gateway
    pub fn read_only(&self) -> VirtualMachines<'_, G> {
        VirtualMachines {
            gateway: &self.gateway,
        }
    }
}

/// Read-only view: listing and lookup, no mutations.
#[derive(Debug)]
pub struct VirtualMachines<'a, G> {
    gateway: &'a G,
}

impl<G: VmGateway> VirtualMachines<'_, G> {
    pub async fn list(&self, ctx: &CallContext) -> Result<Vec<VmRecord>> {
        let vms = self.gateway.list_vms(ctx).await?;
        Ok(vms.into_iter().map(VmRecord::from).collect())
    }

    pub async fn get(&self, ctx: &CallContext, name: &str) -> Result<VmRecord> {
        self.gateway.get_vm(ctx, name).await.map(VmRecord::from)
    }
}
