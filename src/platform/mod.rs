//! Platform abstraction layer.
//!
//! Provides the interfaces the check engine consumes:
//! - Kubernetes cluster reads (infrastructure, nodes, storage classes, PVs)
//! - vSphere connection and property-scoped object retrieval
//!
//! Concrete clients live outside this crate. None of the traits here apply
//! their own timeouts; callers bound them with
//! [`CheckContext::call`](crate::CheckContext::call).

pub mod kube;
pub mod vsphere;

use thiserror::Error;

/// Error returned by platform clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connection, authentication, or API failure
    #[error("{0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The client gave up waiting
    #[error("timed out: {0}")]
    Timeout(String),
}
