//! Mock platform implementations for testing.
//!
//! Provides configurable mock implementations that simulate:
//! - A Kubernetes API with a fixed node list (or a failing one)
//! - A vCenter session that counts lookups, property fetches, and logouts
//! - A connector that hands out that session or refuses to connect

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vsphere_doc::platform::kube::{Infrastructure, KubeClient, Node, PersistentVolume, StorageClass};
use vsphere_doc::platform::vsphere::{
    ManagedObjectReference, PropertySet, VSphereConnector, VimClient,
};
use vsphere_doc::{ClientError, VSphereConfig};

/// Standard vSphere configuration used by all tests
pub fn vsphere_config() -> VSphereConfig {
    VSphereConfig {
        server: "vcenter.example.com".to_string(),
        port: 443,
        user: "k8s@vsphere.local".to_string(),
        password: "secret".to_string(),
        datacenter: "DC0".to_string(),
        default_datastore: Some("LocalDS_0".to_string()),
        folder: None,
        insecure: true,
    }
}

/// BIOS UUID used for the VM backing `node_name`
pub fn uuid_for(node_name: &str) -> String {
    format!("4237a1c8-{}", node_name.to_lowercase())
}

/// A node whose provider ID points at its mock VM
pub fn vsphere_node(name: &str) -> Node {
    Node::new(name).with_provider_id(format!("vsphere://{}", uuid_for(name)))
}

/// Properties of a correctly configured node VM, plus one property outside
/// the prefetch set to catch leaks.
pub fn healthy_vm_properties() -> PropertySet {
    let mut properties = PropertySet::new();
    properties.insert("config.flags".to_string(), json!({"diskUuidEnabled": true}));
    properties.insert(
        "config.extraConfig".to_string(),
        json!([{"key": "disk.EnableUUID", "value": "TRUE"}]),
    );
    properties.insert("summary.runtime.powerState".to_string(), json!("poweredOn"));
    properties
}

/// Mock Kubernetes API
pub struct MockKubeClient {
    nodes: Result<Vec<Node>, ClientError>,
    list_delay: Option<Duration>,
    pub list_node_calls: AtomicUsize,
}

impl MockKubeClient {
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        MockKubeClient {
            nodes: Ok(nodes),
            list_delay: None,
            list_node_calls: AtomicUsize::new(0),
        }
    }

    /// Node listing fails with an API error
    pub fn failing(message: &str) -> Self {
        MockKubeClient {
            nodes: Err(ClientError::Unavailable(message.to_string())),
            list_delay: None,
            list_node_calls: AtomicUsize::new(0),
        }
    }

    /// Node listing hangs for `delay` before answering
    pub fn slow(nodes: Vec<Node>, delay: Duration) -> Self {
        MockKubeClient {
            nodes: Ok(nodes),
            list_delay: Some(delay),
            list_node_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KubeClient for MockKubeClient {
    async fn get_infrastructure(&self) -> Result<Infrastructure, ClientError> {
        Ok(Infrastructure {
            name: "cluster".to_string(),
            platform: "VSphere".to_string(),
            infrastructure_name: "test-cluster-x7k2p".to_string(),
        })
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClientError> {
        self.list_node_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        self.nodes.clone()
    }

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, ClientError> {
        Ok(vec![StorageClass {
            name: "thin".to_string(),
            provisioner: "kubernetes.io/vsphere-volume".to_string(),
            parameters: Default::default(),
        }])
    }

    async fn list_pvs(&self) -> Result<Vec<PersistentVolume>, ClientError> {
        Ok(vec![])
    }
}

/// Mock vCenter session
#[derive(Default)]
pub struct MockVimClient {
    vms: HashMap<String, (ManagedObjectReference, PropertySet)>,
    failing_uuids: HashMap<String, ClientError>,
    pub find_calls: AtomicUsize,
    pub retrieve_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub requested_properties: Mutex<Vec<Vec<String>>>,
}

impl MockVimClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A healthy VM for every given node
    pub fn for_nodes(nodes: &[Node]) -> Self {
        let mut client = Self::new();
        for (i, node) in nodes.iter().enumerate() {
            client.add_vm(&node.name, &format!("vm-{}", 100 + i), healthy_vm_properties());
        }
        client
    }

    pub fn add_vm(&mut self, node_name: &str, moref: &str, properties: PropertySet) {
        self.vms.insert(
            uuid_for(node_name),
            (ManagedObjectReference::virtual_machine(moref), properties),
        );
    }

    pub fn remove_vm(&mut self, node_name: &str) {
        self.vms.remove(&uuid_for(node_name));
    }

    /// Lookups for this node's VM fail with `err`
    pub fn fail_lookup(&mut self, node_name: &str, err: ClientError) {
        self.failing_uuids.insert(uuid_for(node_name), err);
    }

    pub fn retrieve_count(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    pub fn find_count(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VimClient for MockVimClient {
    async fn find_vm_by_uuid(
        &self,
        _datacenter: &str,
        uuid: &str,
    ) -> Result<Option<ManagedObjectReference>, ClientError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failing_uuids.get(uuid) {
            return Err(err.clone());
        }
        Ok(self.vms.get(uuid).map(|(moref, _)| moref.clone()))
    }

    async fn retrieve_properties(
        &self,
        object: &ManagedObjectReference,
        properties: &[&str],
    ) -> Result<PropertySet, ClientError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_properties
            .lock()
            .unwrap()
            .push(properties.iter().map(|p| p.to_string()).collect());

        // Return everything we know, like a sloppy server would.
        self.vms
            .values()
            .find(|(moref, _)| moref == object)
            .map(|(_, props)| props.clone())
            .ok_or_else(|| ClientError::NotFound(object.to_string()))
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock connector
pub struct MockConnector {
    client: Arc<MockVimClient>,
    error: Option<ClientError>,
    delay: Option<Duration>,
    pub connect_calls: AtomicUsize,
}

impl MockConnector {
    pub fn new(client: Arc<MockVimClient>) -> Self {
        MockConnector {
            client,
            error: None,
            delay: None,
            connect_calls: AtomicUsize::new(0),
        }
    }

    /// Connects successfully, but only after `delay`
    pub fn slow(client: Arc<MockVimClient>, delay: Duration) -> Self {
        MockConnector {
            client,
            error: None,
            delay: Some(delay),
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub fn refusing(message: &str) -> Self {
        MockConnector {
            client: Arc::new(MockVimClient::new()),
            error: Some(ClientError::Unavailable(message.to_string())),
            delay: None,
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub fn client(&self) -> &Arc<MockVimClient> {
        &self.client
    }
}

#[async_trait]
impl VSphereConnector for MockConnector {
    async fn connect(&self, _config: &VSphereConfig) -> Result<Arc<dyn VimClient>, ClientError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.client.clone()),
        }
    }
}

/// Nodes `worker-0`..`worker-{count-1}` with matching VMs
pub fn healthy_cluster(count: usize) -> (Arc<MockKubeClient>, MockConnector) {
    let nodes: Vec<Node> = (0..count).map(|i| vsphere_node(&format!("worker-{}", i))).collect();
    let vim = Arc::new(MockVimClient::for_nodes(&nodes));
    (Arc::new(MockKubeClient::with_nodes(nodes)), MockConnector::new(vim))
}
