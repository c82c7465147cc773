//! vSphere connection interface.
//!
//! The engine needs two capabilities from vCenter: locating a VM by its BIOS
//! UUID, and retrieving a chosen subset of a managed object's properties.

use crate::config::VSphereConfig;
use crate::platform::ClientError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Property path → value, as returned by the property collector.
pub type PropertySet = BTreeMap<String, Value>;

/// Reference to a vSphere managed object, e.g. `VirtualMachine:vm-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManagedObjectReference {
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn virtual_machine(value: impl Into<String>) -> Self {
        ManagedObjectReference {
            kind: "VirtualMachine".to_string(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Partial VM snapshot.
///
/// Holds only the properties it was built with; anything else reads as
/// absent even if vCenter returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualMachine {
    reference: ManagedObjectReference,
    properties: PropertySet,
}

impl VirtualMachine {
    /// Build a snapshot keeping only `allowed` property paths.
    pub fn from_properties(
        reference: ManagedObjectReference,
        mut properties: PropertySet,
        allowed: &[&str],
    ) -> Self {
        properties.retain(|path, _| allowed.contains(&path.as_str()));
        VirtualMachine {
            reference,
            properties,
        }
    }

    pub fn reference(&self) -> &ManagedObjectReference {
        &self.reference
    }

    pub fn property(&self, path: &str) -> Option<&Value> {
        self.properties.get(path)
    }

    pub fn property_paths(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Look up an `OptionValue` in `config.extraConfig`. Keys compare
    /// case-insensitively, as vSphere does.
    pub fn extra_config(&self, key: &str) -> Option<&str> {
        self.property("config.extraConfig")?
            .as_array()?
            .iter()
            .find(|option| {
                option
                    .get("key")
                    .and_then(Value::as_str)
                    .is_some_and(|k| k.eq_ignore_ascii_case(key))
            })?
            .get("value")?
            .as_str()
    }
}

/// An authenticated vCenter session.
#[async_trait]
pub trait VimClient: Send + Sync {
    /// Find a VM by BIOS UUID within a datacenter
    async fn find_vm_by_uuid(
        &self,
        datacenter: &str,
        uuid: &str,
    ) -> Result<Option<ManagedObjectReference>, ClientError>;

    /// Retrieve only `properties` of `object`
    async fn retrieve_properties(
        &self,
        object: &ManagedObjectReference,
        properties: &[&str],
    ) -> Result<PropertySet, ClientError>;

    /// End the session
    async fn logout(&self) -> Result<(), ClientError>;
}

/// Opens vCenter sessions.
#[async_trait]
pub trait VSphereConnector: Send + Sync {
    async fn connect(&self, config: &VSphereConfig) -> Result<Arc<dyn VimClient>, ClientError>;
}
