//! DSPC wire types

use serde::{Deserialize, Serialize};

/// A virtual machine as listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    #[serde(rename = "vmName")]
    pub name: String,
}

impl VirtualMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Body of create and delete requests
#[derive(Debug, Serialize)]
pub(crate) struct VmRequest<'a> {
    #[serde(rename = "vmName")]
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateVmResponse {
    pub created: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteVmResponse {
    pub deleted: String,
}

/// Decode a listing. `null`, `[]` and an empty body all mean "no VMs".
pub(crate) fn decode_vm_list(body: &str) -> serde_json::Result<Vec<VirtualMachine>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let vms: Option<Vec<VirtualMachine>> = serde_json::from_str(body)?;
    Ok(vms.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_vm_name_field() {
        let body = serde_json::to_value(VmRequest { name: "vm1" }).unwrap();
        assert_eq!(body, serde_json::json!({"vmName": "vm1"}));
    }

    #[test]
    fn test_decode_vm_list_empty_forms() {
        assert!(decode_vm_list("null").unwrap().is_empty());
        assert!(decode_vm_list("[]").unwrap().is_empty());
        assert!(decode_vm_list("").unwrap().is_empty());
        assert!(decode_vm_list("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_vm_list_entries() {
        let vms = decode_vm_list(r#"[{"vmName":"vm1"},{"vmName":"vm2"}]"#).unwrap();
        assert_eq!(vms, vec![VirtualMachine::new("vm1"), VirtualMachine::new("vm2")]);
    }

    #[test]
    fn test_decode_vm_list_rejects_wrong_shape() {
        assert!(decode_vm_list(r#"{"vmName":"vm1"}"#).is_err());
        assert!(decode_vm_list(r#"[{"name":"vm1"}]"#).is_err());
    }
}
