//! Node VM disk UUID check.
//!
//! Kubernetes vSphere volumes are located by disk UUID, which the guest only
//! sees when `disk.EnableUUID` is turned on for the VM.

use crate::engine::context::CheckContext;
use crate::engine::registry::NodeCheck;
use crate::platform::kube::Node;
use crate::platform::vsphere::VirtualMachine;
use crate::CheckError;
use async_trait::async_trait;
use serde_json::Value;

pub const NAME: &str = "CheckNodeDiskUUID";

/// Fails when the node's VM does not expose disk UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckNodeDiskUuid;

#[async_trait]
impl NodeCheck for CheckNodeDiskUuid {
    async fn run(&self, _ctx: &CheckContext, _node: &Node, vm: &VirtualMachine) -> Result<(), CheckError> {
        let flag = vm
            .property("config.flags")
            .and_then(|flags| flags.get("diskUuidEnabled"))
            .and_then(Value::as_bool);

        // Older vCenters only report the setting through extraConfig.
        let enabled = flag.or_else(|| {
            vm.extra_config("disk.EnableUUID")
                .map(|value| value.trim().eq_ignore_ascii_case("true"))
        });

        match enabled {
            Some(true) => Ok(()),
            Some(false) => Err(CheckError::check("the node has disk.enableUUID = FALSE")),
            None => Err(CheckError::check("the node has empty disk.enableUUID")),
        }
    }
}
