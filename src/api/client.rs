//! DSPC Client
//!
//! Typed VM operations layered on the HTTP transport. Owns status
//! interpretation and payload decoding.

use super::http::{sanitize_for_log, CallContext, HttpClient};
use super::types::{decode_vm_list, CreateVmResponse, DeleteVmResponse, VirtualMachine, VmRequest};
use crate::config::EndpointConfig;
use crate::error::{Error, Op, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::Error as _;
use url::Url;

/// Collection path for virtual machines
pub const VM_PATH: &str = "/virtualmachine";

/// Remote VM operations the lifecycle layer depends on.
///
/// No implementation retries. Create and delete are not idempotent:
/// conflicts and missing names come back as errors.
#[async_trait]
pub trait VmGateway: Send + Sync {
    /// Create a VM. The returned name is the one the remote accepted.
    async fn create_vm(&self, ctx: &CallContext, name: &str) -> Result<VirtualMachine>;

    async fn delete_vm(&self, ctx: &CallContext, name: &str) -> Result<()>;

    async fn list_vms(&self, ctx: &CallContext) -> Result<Vec<VirtualMachine>>;

    /// Look a VM up by exact name. The API has no get endpoint, so this
    /// lists and scans client-side.
    async fn get_vm(&self, ctx: &CallContext, name: &str) -> Result<VirtualMachine> {
        let vms = self
            .list_vms(ctx)
            .await
            .map_err(|e| match e {
                Error::Operation { source, .. } => (*source).during(Op::Lookup(name.to_string())),
                other => other.during(Op::Lookup(name.to_string())),
            })?;
        find_by_name(vms, name)
    }
}

/// Exact, case-sensitive match
pub fn find_by_name(vms: Vec<VirtualMachine>, name: &str) -> Result<VirtualMachine> {
    vms.into_iter()
        .find(|vm| vm.name == name)
        .ok_or_else(|| Error::NotFound(name.to_string()))
}

/// Main DSPC client
#[derive(Clone, Debug)]
pub struct DspcClient {
    pub http: HttpClient,
}

impl DspcClient {
    /// Create a new DSPC client
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let client = Self::from_http(HttpClient::from_config(config)?);
        tracing::info!("DSPC client configured for {}", client.endpoint());
        Ok(client)
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn endpoint(&self) -> &Url {
        self.http.base_url()
    }

    /// Send a request and return the body of a 2xx response.
    async fn call(
        &self,
        ctx: &CallContext,
        method: Method,
        body: Option<&VmRequest<'_>>,
    ) -> Result<String> {
        let response = self.http.request(ctx, method, VM_PATH, body).await?;
        let status = response.status();
        let body = match self.http.read_body(ctx, response).await {
            Ok(body) => body,
            // A failed status survives an unreadable body; cancellation still wins
            Err(e) if !status.is_success() && !e.is_cancelled() && !e.is_timeout() => {
                tracing::error!("API error: {} - {}", status, e);
                return Err(Error::Api {
                    status: status.as_u16(),
                    body: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if !status.is_success() {
            // Only the log line is sanitized; the error keeps the body verbatim
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn create(&self, ctx: &CallContext, name: &str) -> Result<VirtualMachine> {
        let body = self
            .call(ctx, Method::POST, Some(&VmRequest { name }))
            .await?;

        let ack: CreateVmResponse = serde_json::from_str(&body).map_err(Error::Decode)?;
        if ack.created.is_empty() {
            return Err(Error::Decode(serde_json::Error::custom(
                "create acknowledgment has an empty 'created' name",
            )));
        }
        if ack.created != name {
            tracing::info!("API normalized VM name '{}' to '{}'", name, ack.created);
        }

        Ok(VirtualMachine::new(ack.created))
    }

    async fn delete(&self, ctx: &CallContext, name: &str) -> Result<()> {
        let body = self
            .call(ctx, Method::DELETE, Some(&VmRequest { name }))
            .await?;

        match serde_json::from_str::<DeleteVmResponse>(&body) {
            Ok(ack) => tracing::debug!("API acknowledged deletion of '{}'", ack.deleted),
            Err(_) if body.trim().is_empty() => {
                tracing::debug!("Delete of '{}' returned no acknowledgment body", name)
            }
            Err(e) => tracing::warn!(
                "Delete of '{}' succeeded with an unrecognized acknowledgment ({}): {}",
                name,
                e,
                sanitize_for_log(&body)
            ),
        }

        Ok(())
    }

    async fn list(&self, ctx: &CallContext) -> Result<Vec<VirtualMachine>> {
        let body = self.call(ctx, Method::GET, None).await?;
        decode_vm_list(&body).map_err(Error::Decode)
    }
}

#[async_trait]
impl VmGateway for DspcClient {
    async fn create_vm(&self, ctx: &CallContext, name: &str) -> Result<VirtualMachine> {
        self.create(ctx, name)
            .await
            .map_err(|e| e.during(Op::Create(name.to_string())))
    }

    async fn delete_vm(&self, ctx: &CallContext, name: &str) -> Result<()> {
        self.delete(ctx, name)
            .await
            .map_err(|e| e.during(Op::Delete(name.to_string())))
    }

    async fn list_vms(&self, ctx: &CallContext) -> Result<Vec<VirtualMachine>> {
        let vms = self.list(ctx).await.map_err(|e| e.during(Op::List))?;
        tracing::debug!("Listed {} VMs", vms.len());
        Ok(vms)
    }
}
