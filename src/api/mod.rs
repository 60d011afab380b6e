//! DSPC API interaction module
//!
//! This module provides the client side of the DSPC VM Deployer API.
//!
//! # Module Structure
//!
//! - [`http`] - Authenticated HTTP transport with cancellation and deadlines
//! - [`client`] - Typed VM operations and the [`client::VmGateway`] trait
//! - [`types`] - Wire types for the `/virtualmachine` endpoint
//!
//! # Example
//!
//! ```ignore
//! use dspc::api::{client::{DspcClient, VmGateway}, http::CallContext};
//!
//! async fn example(config: &dspc::EndpointConfig) -> dspc::Result<()> {
//!     let client = DspcClient::new(config)?;
//!     let vms = client.list_vms(&CallContext::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod types;
