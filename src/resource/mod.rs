//! Resource lifecycle layer
//!
//! Maps declarative Create/Read/Update/Delete/Import onto DSPC API calls.
//!
//! # Architecture
//!
//! - [`lifecycle`] - The CRUD/import operations over a [`crate::api::client::VmGateway`]
//! - [`state`] - Tracked instances, planning, and state transitions
//!
//! # Example
//!
//! ```ignore
//! use dspc::resource::{Instance, VirtualMachineResource};
//!
//! async fn converge(resource: &VirtualMachineResource, ctx: &dspc::CallContext) -> dspc::Result<()> {
//!     let mut instance = Instance::planned();
//!     let action = instance.plan(Some("web-1"));
//!     instance.apply(resource, ctx, &action).await
//! }
//! ```

pub mod lifecycle;
pub mod state;

pub use lifecycle::{ReadOutcome, VirtualMachineResource, VirtualMachines, VmRecord};
pub use state::{Instance, PlannedAction, ResourceState};
