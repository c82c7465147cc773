//! Kubernetes cluster-read adapter.
//!
//! Only the fields the engine and built-in checks read are modelled; a real
//! adapter converts from its API types into these.

use crate::platform::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const VSPHERE_PROVIDER_PREFIX: &str = "vsphere://";

/// Cluster-wide infrastructure descriptor (`infrastructures.config.openshift.io/cluster`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub name: String,
    /// Platform type, e.g. "VSphere"
    pub platform: String,
    pub infrastructure_name: String,
}

/// A cluster node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// `spec.providerID`, e.g. "vsphere://4237a1c8-..."
    pub provider_id: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// BIOS UUID of the backing VM, parsed from the provider ID.
    ///
    /// Returns `None` when the node is not managed by the vSphere cloud
    /// provider or the ID is empty.
    pub fn vm_uuid(&self) -> Option<String> {
        let provider_id = self.provider_id.as_deref()?;
        let uuid = provider_id.strip_prefix(VSPHERE_PROVIDER_PREFIX)?.trim();
        if uuid.is_empty() {
            None
        } else {
            Some(uuid.to_lowercase())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClass {
    pub name: String,
    pub provisioner: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentVolume {
    pub name: String,
    /// `spec.vsphereVolume.volumePath` for in-tree vSphere volumes
    pub vsphere_volume_path: Option<String>,
    /// `spec.csi.driver` for CSI volumes
    pub csi_driver: Option<String>,
}

/// Read access to the Kubernetes API used by checks and the node runner.
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Current cluster Infrastructure instance
    async fn get_infrastructure(&self) -> Result<Infrastructure, ClientError>;

    /// All nodes, in API listing order
    async fn list_nodes(&self) -> Result<Vec<Node>, ClientError>;

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, ClientError>;

    async fn list_pvs(&self) -> Result<Vec<PersistentVolume>, ClientError>;
}
