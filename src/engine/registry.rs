//! Check registration.
//!
//! A [`CheckRegistry`] holds the cluster and node checks for one
//! orchestrator. It is built by the caller before a run and only read
//! afterwards; iteration is always in lexicographic name order so that
//! repeated runs produce identically ordered reports.

use crate::engine::context::CheckContext;
use crate::engine::result::CheckKind;
use crate::platform::kube::Node;
use crate::platform::vsphere::VirtualMachine;
use crate::{CheckError, VsphereDocError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// VM properties fetched once per node before node checks run.
///
/// Node checks may only read these paths from their [`VirtualMachine`]; any
/// other path is unpopulated. A node check that needs a new property must add
/// it here.
pub const NODE_PROPERTIES: &[&str] = &["config.extraConfig", "config.flags"];

/// A check executed once per run.
#[async_trait]
pub trait ClusterCheck: Send + Sync {
    async fn run(&self, ctx: &CheckContext) -> Result<(), CheckError>;
}

/// A check executed once per node.
///
/// `vm` is the node's VM with only [`NODE_PROPERTIES`] populated.
#[async_trait]
pub trait NodeCheck: Send + Sync {
    async fn run(&self, ctx: &CheckContext, node: &Node, vm: &VirtualMachine) -> Result<(), CheckError>;
}

#[derive(Default, Clone)]
pub struct CheckRegistry {
    cluster_checks: BTreeMap<String, Arc<dyn ClusterCheck>>,
    node_checks: BTreeMap<String, Arc<dyn NodeCheck>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_cluster_check(
        &mut self,
        name: impl Into<String>,
        check: impl ClusterCheck + 'static,
    ) -> Result<(), VsphereDocError> {
        let name = name.into();
        if self.cluster_checks.contains_key(&name) {
            return Err(VsphereDocError::DuplicateCheck {
                class: CheckKind::Cluster,
                name,
            });
        }
        self.cluster_checks.insert(name, Arc::new(check));
        Ok(())
    }

    pub fn register_node_check(
        &mut self,
        name: impl Into<String>,
        check: impl NodeCheck + 'static,
    ) -> Result<(), VsphereDocError> {
        let name = name.into();
        if self.node_checks.contains_key(&name) {
            return Err(VsphereDocError::DuplicateCheck {
                class: CheckKind::Node,
                name,
            });
        }
        self.node_checks.insert(name, Arc::new(check));
        Ok(())
    }

    /// Cluster checks in name order
    pub fn cluster_checks(&self) -> impl Iterator<Item = (&str, &Arc<dyn ClusterCheck>)> {
        self.cluster_checks.iter().map(|(name, check)| (name.as_str(), check))
    }

    /// Node checks in name order
    pub fn node_checks(&self) -> impl Iterator<Item = (&str, &Arc<dyn NodeCheck>)> {
        self.node_checks.iter().map(|(name, check)| (name.as_str(), check))
    }

    pub fn cluster_check_names(&self) -> Vec<&str> {
        self.cluster_checks.keys().map(String::as_str).collect()
    }

    pub fn node_check_names(&self) -> Vec<&str> {
        self.node_checks.keys().map(String::as_str).collect()
    }

    pub fn cluster_check_count(&self) -> usize {
        self.cluster_checks.len()
    }

    pub fn node_check_count(&self) -> usize {
        self.node_checks.len()
    }

    pub fn len(&self) -> usize {
        self.cluster_checks.len() + self.node_checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
