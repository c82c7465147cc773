//! Run context shared by every check in a run.
//!
//! The context owns the vCenter session and the run deadline. It is built
//! once, handed to checks by shared reference, and released once after both
//! check phases are done.

use crate::config::{RunConfig, VSphereConfig};
use crate::platform::kube::{Infrastructure, KubeClient, Node, PersistentVolume, StorageClass};
use crate::platform::vsphere::{VSphereConnector, VimClient};
use crate::platform::ClientError;
use crate::{CheckError, VsphereDocError};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

// Stand-in deadline for timeouts too large to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

pub struct CheckContext {
    deadline: Instant,
    timeout: Duration,
    vsphere_config: VSphereConfig,
    vim_client: Arc<dyn VimClient>,
    kube_client: Arc<dyn KubeClient>,
    released: AtomicBool,
}

impl CheckContext {
    /// Connect to vCenter and start the run deadline.
    ///
    /// The deadline is `now + config.timeout()` and also bounds the connect
    /// itself. Any connect failure is fatal for the run.
    pub async fn build(
        config: &RunConfig,
        vsphere_config: VSphereConfig,
        connector: &dyn VSphereConnector,
        kube_client: Arc<dyn KubeClient>,
    ) -> Result<Self, VsphereDocError> {
        let timeout = config.timeout();
        let deadline = deadline_after(timeout);

        info!(
            server = %vsphere_config.server,
            timeout_ms = config.timeout_ms,
            "connecting to vCenter"
        );

        let vim_client = match tokio::time::timeout_at(deadline, connector.connect(&vsphere_config)).await {
            Ok(Ok(client)) => client,
            Ok(Err(err)) => {
                return Err(VsphereDocError::Infrastructure(format!(
                    "failed to connect to vCenter {}: {}",
                    vsphere_config.server, err
                )))
            }
            Err(_) => {
                return Err(VsphereDocError::Infrastructure(format!(
                    "timed out connecting to vCenter {} after {}ms",
                    vsphere_config.server, config.timeout_ms
                )))
            }
        };

        Ok(CheckContext {
            deadline,
            timeout,
            vsphere_config,
            vim_client,
            kube_client,
            released: AtomicBool::new(false),
        })
    }

    /// Assemble a context around an existing session.
    ///
    /// Useful for exercising a single check in isolation.
    pub fn from_parts(
        config: &RunConfig,
        vsphere_config: VSphereConfig,
        vim_client: Arc<dyn VimClient>,
        kube_client: Arc<dyn KubeClient>,
    ) -> Self {
        let timeout = config.timeout();
        CheckContext {
            deadline: deadline_after(timeout),
            timeout,
            vsphere_config,
            vim_client,
            kube_client,
            released: AtomicBool::new(false),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn vsphere_config(&self) -> &VSphereConfig {
        &self.vsphere_config
    }

    pub fn vim_client(&self) -> &dyn VimClient {
        self.vim_client.as_ref()
    }

    pub fn kube_client(&self) -> &dyn KubeClient {
        self.kube_client.as_ref()
    }

    /// Await a remote call, bounded by the run deadline.
    ///
    /// `operation` names the call in error messages. Deadline expiry and
    /// client-side timeouts become [`CheckError::Timeout`], every other
    /// client error becomes [`CheckError::Infrastructure`].
    pub async fn call<T, F>(&self, operation: &str, request: F) -> Result<T, CheckError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout_at(self.deadline, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(ClientError::Timeout(message))) => {
                Err(CheckError::Timeout(format!("{}: {}", operation, message)))
            }
            Ok(Err(err)) => Err(CheckError::Infrastructure(format!("{}: {}", operation, err))),
            Err(_) => Err(CheckError::Timeout(format!(
                "{} exceeded the {}ms run timeout",
                operation,
                self.timeout.as_millis()
            ))),
        }
    }

    pub async fn get_infrastructure(&self) -> Result<Infrastructure, CheckError> {
        self.call("get infrastructure", self.kube_client.get_infrastructure())
            .await
    }

    pub async fn list_nodes(&self) -> Result<Vec<Node>, CheckError> {
        self.call("list nodes", self.kube_client.list_nodes()).await
    }

    pub async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, CheckError> {
        self.call("list storage classes", self.kube_client.list_storage_classes())
            .await
    }

    pub async fn list_pvs(&self) -> Result<Vec<PersistentVolume>, CheckError> {
        self.call("list persistent volumes", self.kube_client.list_pvs())
            .await
    }

    /// End the vCenter session. Only the first call has any effect.
    pub(crate) async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        logout(Arc::clone(&self.vim_client)).await;
    }
}

/// Ends the session of a context when the run that owns it goes away.
///
/// A run that completes calls [`SessionGuard::release`]. A run whose future
/// is dropped part way through leaves the logout to `Drop`, which hands it to
/// the current runtime.
pub(crate) struct SessionGuard {
    ctx: Arc<CheckContext>,
}

impl SessionGuard {
    pub(crate) fn new(ctx: Arc<CheckContext>) -> Self {
        SessionGuard { ctx }
    }

    pub(crate) async fn release(self) {
        self.ctx.release().await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.ctx.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let client = Arc::clone(&self.ctx.vim_client);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("run cancelled, releasing vCenter session in the background");
                handle.spawn(logout(client));
            }
            Err(_) => warn!("run cancelled outside a runtime, vCenter session not released"),
        }
    }
}

async fn logout(client: Arc<dyn VimClient>) {
    match tokio::time::timeout(LOGOUT_TIMEOUT, client.logout()).await {
        Ok(Ok(())) => debug!("vCenter session released"),
        Ok(Err(err)) => warn!(error = %err, "vCenter logout failed"),
        Err(_) => warn!("vCenter logout timed out"),
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}
