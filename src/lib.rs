//! vsphere-doc library
//!
//! vSphere diagnostics for Kubernetes clusters.
//!
//! This library runs a registry of independent checks against the vSphere
//! platform that backs a cluster:
//! - Cluster checks run once per run against the shared [`CheckContext`]
//! - Node checks run once per node against a partial VM snapshot that is
//!   fetched once per node, restricted to [`NODE_PROPERTIES`]
//! - Every outcome is collected into an ordered [`Report`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vsphere_doc::{checks, run_checks, Config};
//! # async fn example(
//! #     connector: &dyn vsphere_doc::VSphereConnector,
//! #     kube: Arc<dyn vsphere_doc::KubeClient>,
//! # ) -> Result<(), vsphere_doc::VsphereDocError> {
//! let config = Config::load("/etc/vsphere-doc/config.toml")?;
//! let registry = checks::default_registry()?;
//!
//! let report = run_checks(&config.run, registry, config.vsphere, connector, kube).await?;
//! println!("Checks failed: {}", report.summary().failed);
//! # Ok(())
//! # }
//! ```

pub mod checks;
pub mod config;
pub mod engine;
pub mod platform;

use std::sync::Arc;
use thiserror::Error;

use engine::orchestrator::CheckOrchestrator;

// Re-exports for public API
pub use config::{Config, RunConfig, VSphereConfig};
pub use engine::context::CheckContext;
pub use engine::registry::{CheckRegistry, ClusterCheck, NodeCheck, NODE_PROPERTIES};
pub use engine::result::{CheckKind, CheckOutcome, CheckResult, FailureKind, Report, ResultSummary};
pub use platform::kube::KubeClient;
pub use platform::vsphere::{VSphereConnector, VimClient};
pub use platform::ClientError;

/// Typed failure returned by a single check.
///
/// Checks return `Err(CheckError::Check(..))` for their own business-rule
/// violations. Client errors convert through `?`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// vSphere or Kubernetes could not be reached, listed, or queried
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    /// The run deadline expired
    #[error("timed out: {0}")]
    Timeout(String),
    /// The check's own rule was violated
    #[error("{0}")]
    Check(String),
}

impl CheckError {
    /// Shorthand for a business-rule failure.
    pub fn check(reason: impl Into<String>) -> Self {
        CheckError::Check(reason.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            CheckError::Infrastructure(_) => FailureKind::Infrastructure,
            CheckError::Timeout(_) => FailureKind::Timeout,
            CheckError::Check(_) => FailureKind::Check,
        }
    }

    /// Message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            CheckError::Infrastructure(m) | CheckError::Timeout(m) | CheckError::Check(m) => m,
        }
    }
}

impl From<ClientError> for CheckError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout(m) => CheckError::Timeout(m),
            other => CheckError::Infrastructure(other.to_string()),
        }
    }
}

/// Error types for vsphere-doc operations that abort a run.
#[derive(Debug, Error)]
pub enum VsphereDocError {
    /// The run context could not be built; no checks were executed
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    /// A check with this name is already registered in the same class
    #[error("{class} check {name:?} is already registered")]
    DuplicateCheck { class: CheckKind, name: String },
    /// Configuration is present but invalid
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Run all registered checks and return the report.
///
/// This is the main entry point. It builds the run context (connecting to
/// vSphere), runs every cluster check, then every node check, and releases
/// the connection before returning.
///
/// # Errors
///
/// Returns [`VsphereDocError::Infrastructure`] when the vSphere connection
/// cannot be established. Every other failure is recorded in the report.
pub async fn run_checks(
    config: &RunConfig,
    registry: CheckRegistry,
    vsphere: VSphereConfig,
    connector: &dyn VSphereConnector,
    kube: Arc<dyn KubeClient>,
) -> Result<Report, VsphereDocError> {
    let orchestrator = CheckOrchestrator::new(config.clone(), registry);
    orchestrator.run(vsphere, connector, kube).await
}
