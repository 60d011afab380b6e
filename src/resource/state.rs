//! Tracked resource instances
//!
//! An [`Instance`] is one VM as the orchestrator sees it. Its state only
//! moves after the remote has acknowledged the step; a failed or cancelled
//! call leaves it where it was.

use super::lifecycle::{ReadOutcome, VirtualMachineResource, VmRecord};
use crate::api::client::VmGateway;
use crate::api::http::CallContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a resource instance.
///
/// There is no updating state: a rename goes `Present -> Absent -> Present`,
/// and stops at `Absent` if the recreate fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    /// Desired but not yet created
    Planned,
    /// Confirmed to exist remotely and tracked locally
    Present,
    /// Removed and untracked
    Absent,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Planned => write!(f, "planned"),
            ResourceState::Present => write!(f, "present"),
            ResourceState::Absent => write!(f, "absent"),
        }
    }
}

/// What applying a desired name to an instance requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    NoChange,
    Create { name: String },
    /// The name requires replacement: destroy `from`, then create `to`
    Replace { from: String, to: String },
    Delete { name: String },
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedAction::NoChange => write!(f, "no changes"),
            PlannedAction::Create { name } => write!(f, "+ create '{name}'"),
            PlannedAction::Replace { from, to } => write!(f, "-/+ replace '{from}' with '{to}'"),
            PlannedAction::Delete { name } => write!(f, "- destroy '{name}'"),
        }
    }
}

/// One resource instance and its tracked record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    state: ResourceState,
    record: Option<VmRecord>,
}

impl Default for Instance {
    fn default() -> Self {
        Self::planned()
    }
}

impl Instance {
    pub fn planned() -> Self {
        Self {
            state: ResourceState::Planned,
            record: None,
        }
    }

    /// An instance already known to exist, e.g. restored from caller state
    pub fn present(record: VmRecord) -> Self {
        Self {
            state: ResourceState::Present,
            record: Some(record),
        }
    }

    /// Seed a new tracked instance from an existing remote VM.
    /// Produces no instance when the lookup fails.
    pub async fn import<G: VmGateway>(
        resource: &VirtualMachineResource<G>,
        ctx: &CallContext,
        id: &str,
    ) -> Result<Self> {
        let record = resource.import(ctx, id).await?;
        Ok(Self::present(record))
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn record(&self) -> Option<&VmRecord> {
        self.record.as_ref()
    }

    pub fn is_tracked(&self) -> bool {
        self.state == ResourceState::Present
    }

    /// Decide what reaching `desired` takes. Never performs I/O.
    pub fn plan(&self, desired: Option<&str>) -> PlannedAction {
        match (&self.record, desired) {
            (Some(record), Some(name)) if record.name == name => PlannedAction::NoChange,
            (Some(record), Some(name)) => PlannedAction::Replace {
                from: record.name.clone(),
                to: name.to_string(),
            },
            (Some(record), None) => PlannedAction::Delete {
                name: record.name.clone(),
            },
            (None, Some(name)) => PlannedAction::Create {
                name: name.to_string(),
            },
            (None, None) => PlannedAction::NoChange,
        }
    }

    /// Execute a planned action, one remote step at a time.
    pub async fn apply<G: VmGateway>(
        &mut self,
        resource: &VirtualMachineResource<G>,
        ctx: &CallContext,
        action: &PlannedAction,
    ) -> Result<()> {
        match action {
            PlannedAction::NoChange => Ok(()),
            PlannedAction::Create { name } => self.create(resource, ctx, name).await,
            PlannedAction::Delete { .. } => self.destroy(resource, ctx).await,
            PlannedAction::Replace { to, .. } => {
                self.destroy(resource, ctx).await?;
                self.create(resource, ctx, to).await
            }
        }
    }

    /// `Planned`/`Absent` -> `Present`. A failed create leaves the state as it was.
    pub async fn create<G: VmGateway>(
        &mut self,
        resource: &VirtualMachineResource<G>,
        ctx: &CallContext,
        name: &str,
    ) -> Result<()> {
        if self.state == ResourceState::Present {
            return Err(Error::InvalidState {
                expected: ResourceState::Planned,
                actual: self.state,
            });
        }

        let record = resource.create(ctx, name).await?;
        self.record = Some(record);
        self.state = ResourceState::Present;
        Ok(())
    }

    /// Refresh a `Present` instance. Drift moves it to `Absent`; any other
    /// error leaves it untouched.
    pub async fn refresh<G: VmGateway>(
        &mut self,
        resource: &VirtualMachineResource<G>,
        ctx: &CallContext,
    ) -> Result<ResourceState> {
        let current = self.require_present()?;

        match resource.read(ctx, current).await? {
            ReadOutcome::Present(record) => self.record = Some(record),
            ReadOutcome::Gone => {
                self.record = None;
                self.state = ResourceState::Absent;
            }
        }
        Ok(self.state)
    }

    /// Always rejected; the instance is unchanged.
    pub fn update<G: VmGateway>(&self, resource: &VirtualMachineResource<G>, desired: &str) -> Result<()> {
        let current = self.require_present()?;
        resource.update(current, desired).map(|_| ())
    }

    /// `Present` -> `Absent`
    pub async fn destroy<G: VmGateway>(
        &mut self,
        resource: &VirtualMachineResource<G>,
        ctx: &CallContext,
    ) -> Result<()> {
        let current = self.require_present()?;
        resource.delete(ctx, current).await?;
        self.record = None;
        self.state = ResourceState::Absent;
        Ok(())
    }

    fn require_present(&self) -> Result<&VmRecord> {
        match (&self.record, self.state) {
            (Some(record), ResourceState::Present) => Ok(record),
            _ => Err(Error::InvalidState {
                expected: ResourceState::Present,
                actual: self.state,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_create_from_planned() {
        let instance = Instance::planned();
        assert_eq!(
            instance.plan(Some("vm1")),
            PlannedAction::Create { name: "vm1".into() }
        );
        assert_eq!(instance.plan(None), PlannedAction::NoChange);
    }

    #[test]
    fn test_plan_same_name_is_no_change() {
        let instance = Instance::present(VmRecord::new("vm1"));
        assert_eq!(instance.plan(Some("vm1")), PlannedAction::NoChange);
    }

    #[test]
    fn test_plan_rename_requires_replace() {
        let instance = Instance::present(VmRecord::new("vm1"));
        assert_eq!(
            instance.plan(Some("vm2")),
            PlannedAction::Replace {
                from: "vm1".into(),
                to: "vm2".into()
            }
        );
    }

    #[test]
    fn test_plan_removed_config_deletes() {
        let instance = Instance::present(VmRecord::new("vm1"));
        assert_eq!(
            instance.plan(None),
            PlannedAction::Delete { name: "vm1".into() }
        );
    }

    #[test]
    fn test_plan_display() {
        let action = PlannedAction::Replace {
            from: "a".into(),
            to: "b".into(),
        };
        assert_eq!(action.to_string(), "-/+ replace 'a' with 'b'");
    }

    #[test]
    fn test_record_id_is_name() {
        let record = VmRecord::new("vm1");
        assert_eq!(record.id, "vm1");
        assert_eq!(record.name, "vm1");
    }
}
