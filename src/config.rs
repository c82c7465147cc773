//! Run and vSphere configuration.
//!
//! Configuration is an explicit value handed to the orchestrator. A TOML file
//! with a `[run]` and a `[vsphere]` table can be loaded with [`Config::load`]:
//!
//! ```toml
//! [run]
//! timeout_ms = 10000
//!
//! [vsphere]
//! server = "vcenter.example.com"
//! user = "k8s@vsphere.local"
//! password = "secret"
//! datacenter = "DC0"
//! default_datastore = "LocalDS_0"
//! ```

use crate::VsphereDocError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_VSPHERE_PORT: u16 = 443;

/// Per-run settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Budget for every remote call made during a run, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RunConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        RunConfig {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Connection settings for vCenter, as found in the cluster's cloud config.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VSphereConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Datacenter searched for node VMs
    pub datacenter: String,
    #[serde(default)]
    pub default_datastore: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

fn default_port() -> u16 {
    DEFAULT_VSPHERE_PORT
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for VSphereConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VSphereConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("datacenter", &self.datacenter)
            .field("default_datastore", &self.default_datastore)
            .field("folder", &self.folder)
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl VSphereConfig {
    /// Reject configurations that cannot possibly connect.
    pub fn validate(&self) -> Result<(), VsphereDocError> {
        let required = [
            ("server", &self.server),
            ("user", &self.user),
            ("datacenter", &self.datacenter),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(VsphereDocError::Config(format!(
                    "vsphere.{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Complete file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    pub vsphere: VSphereConfig,
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, VsphereDocError> {
        let config: Config = toml::from_str(content)?;
        config.vsphere.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VsphereDocError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| VsphereDocError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
