//! Declarative lifecycle client for DSPC virtual machines.
//!
//! The crate reconciles a desired VM (identified only by its name) against
//! the DSPC VM Deployer API:
//!
//! - [`api`] - HTTP transport and typed remote operations
//! - [`resource`] - Create/Read/Update/Delete/Import lifecycle and tracked state
//! - [`config`] - Endpoint configuration with environment fallbacks
//!
//! One immutable [`DspcClient`] is built per process and passed explicitly
//! to every operation. It is cheap to clone and safe to share across tasks.

pub mod api;
pub mod config;
pub mod error;
pub mod resource;

pub use api::client::{DspcClient, VmGateway};
pub use api::http::{CallContext, HttpClient, TransportError};
pub use api::types::VirtualMachine;
pub use config::{EndpointConfig, ProviderConfig};
pub use error::{Error, Result};
pub use resource::{
    Instance, PlannedAction, ReadOutcome, ResourceState, VirtualMachineResource, VmRecord,
};
