//! Built-in checks.
//!
//! Most checks are supplied by the caller and registered on a
//! [`CheckRegistry`]. This module carries the checks every vSphere cluster
//! needs regardless of deployment.
//!
//! # Writing a check
//!
//! Implement [`ClusterCheck`](crate::ClusterCheck) or
//! [`NodeCheck`](crate::NodeCheck) on a small value. Return
//! `Err(CheckError::Check(..))` for a rule violation; use `?` on calls made
//! through [`CheckContext::call`](crate::CheckContext::call) so deadline and
//! infrastructure errors keep their kind. Node checks may only read the
//! properties listed in [`NODE_PROPERTIES`](crate::NODE_PROPERTIES).

pub mod node_disk_uuid;

use crate::engine::registry::CheckRegistry;
use crate::VsphereDocError;

/// Registry with all built-in checks
pub fn default_registry() -> Result<CheckRegistry, VsphereDocError> {
    let mut registry = CheckRegistry::new();
    registry.register_node_check(node_disk_uuid::NAME, node_disk_uuid::CheckNodeDiskUuid)?;
    Ok(registry)
}
