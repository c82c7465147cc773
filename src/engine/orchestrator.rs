//! Check execution orchestrator.
//!
//! Runs every registered check once per run and collects the outcomes.
//!
//! # Graceful Degradation
//!
//! This module handles errors gracefully:
//! - vCenter connection failure: the run aborts with `VsphereDocError::Infrastructure`
//! - Check failure: recorded under the check's name, the next check still runs
//! - Check panic: caught at the task boundary, recorded as a check failure
//! - Run deadline expired: every check from then on still runs, and is
//!   recorded as a timeout
//! - Run future dropped by the caller: the session is released in the background
//! - Node listing failure: node phase aborts with a single `ListNodes` entry
//! - VM lookup failure: recorded for every node check of that node only
//!
//! Checks run one at a time, cluster checks first, then node checks node by
//! node. The vCenter session is shared by all of them.

use crate::config::{RunConfig, VSphereConfig};
use crate::engine::context::{CheckContext, SessionGuard};
use crate::engine::registry::{CheckRegistry, NODE_PROPERTIES};
use crate::engine::result::{CheckOutcome, CheckResult, FailureKind, Report, ResultAggregator};
use crate::platform::kube::{KubeClient, Node};
use crate::platform::vsphere::{VSphereConnector, VirtualMachine};
use crate::{CheckError, VsphereDocError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Check orchestrator
pub struct CheckOrchestrator {
    config: RunConfig,
    registry: CheckRegistry,
}

impl CheckOrchestrator {
    pub fn new(config: RunConfig, registry: CheckRegistry) -> Self {
        CheckOrchestrator { config, registry }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Run all registered checks.
    ///
    /// Builds the run context, runs the cluster phase and then the node
    /// phase, and releases the vCenter session before returning.
    pub async fn run(
        &self,
        vsphere: VSphereConfig,
        connector: &dyn VSphereConnector,
        kube: Arc<dyn KubeClient>,
    ) -> Result<Report, VsphereDocError> {
        let start = Instant::now();

        let ctx = match CheckContext::build(&self.config, vsphere, connector, kube).await {
            Ok(ctx) => Arc::new(ctx),
            Err(err) => {
                error!(error = %err, "cannot build run context, no checks executed");
                return Err(err);
            }
        };
        let session = SessionGuard::new(Arc::clone(&ctx));

        info!(
            cluster_checks = self.registry.cluster_check_count(),
            node_checks = self.registry.node_check_count(),
            "starting check run"
        );

        let mut aggregator = ResultAggregator::new();
        self.run_cluster_checks(&ctx, &mut aggregator).await;
        self.run_node_checks(&ctx, &mut aggregator).await;

        session.release().await;

        let report = aggregator.into_report(elapsed_ms(start));
        let summary = report.summary();
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            timeouts = summary.timeouts,
            duration_ms = report.total_duration_ms,
            "check run finished"
        );
        Ok(report)
    }

    /// Run every cluster check in name order.
    pub async fn run_cluster_checks(&self, ctx: &Arc<CheckContext>, aggregator: &mut ResultAggregator) {
        debug!(count = self.registry.cluster_check_count(), "running cluster checks");

        for (name, check) in self.registry.cluster_checks() {
            let start = Instant::now();

            let check = Arc::clone(check);
            let task_ctx = Arc::clone(ctx);
            let outcome = execute(ctx, async move { check.run(&task_ctx).await }).await;

            log_outcome(name, None, &outcome);
            aggregator.add_result(CheckResult::cluster(name, outcome, elapsed_ms(start)));
        }
    }

    /// List nodes, fetch each node's VM once, and run every node check
    /// against it.
    pub async fn run_node_checks(&self, ctx: &Arc<CheckContext>, aggregator: &mut ResultAggregator) {
        if self.registry.node_check_count() == 0 {
            debug!("no node checks registered, skipping node phase");
            return;
        }

        let start = Instant::now();
        let nodes = match ctx.list_nodes().await {
            Ok(nodes) => nodes,
            Err(err) => {
                error!(error = %err, "cannot list nodes, skipping node checks");
                aggregator.add_result(CheckResult::node_phase(&err, elapsed_ms(start)));
                return;
            }
        };

        debug!(
            nodes = nodes.len(),
            checks = self.registry.node_check_count(),
            "running node checks"
        );

        for node in nodes {
            let fetch_start = Instant::now();
            let fetched = fetch_vm(ctx, &node).await;
            match fetched {
                Ok(vm) => {
                    self.run_checks_for_node(ctx, Arc::new(node), Arc::new(vm), aggregator)
                        .await;
                }
                Err(err) => {
                    warn!(node = %node.name, error = %err, "cannot resolve VM for node");
                    let outcome = CheckOutcome::from(&err);
                    let duration_ms = elapsed_ms(fetch_start);
                    for (name, _) in self.registry.node_checks() {
                        aggregator.add_result(CheckResult::node(
                            name,
                            node.name.as_str(),
                            outcome.clone(),
                            duration_ms,
                        ));
                    }
                }
            }
        }
    }

    async fn run_checks_for_node(
        &self,
        ctx: &Arc<CheckContext>,
        node: Arc<Node>,
        vm: Arc<VirtualMachine>,
        aggregator: &mut ResultAggregator,
    ) {
        for (name, check) in self.registry.node_checks() {
            let start = Instant::now();

            let check = Arc::clone(check);
            let task_ctx = Arc::clone(ctx);
            let task_node = Arc::clone(&node);
            let task_vm = Arc::clone(&vm);
            let outcome = execute(ctx, async move {
                check.run(&task_ctx, &task_node, &task_vm).await
            })
            .await;

            log_outcome(name, Some(&node.name), &outcome);
            aggregator.add_result(CheckResult::node(
                name,
                node.name.as_str(),
                outcome,
                elapsed_ms(start),
            ));
        }
    }
}

/// Resolve a node's VM and fetch its prefetch properties.
///
/// Issues exactly one property retrieval, scoped to [`NODE_PROPERTIES`].
async fn fetch_vm(ctx: &CheckContext, node: &Node) -> Result<VirtualMachine, CheckError> {
    let uuid = node.vm_uuid().ok_or_else(|| {
        CheckError::Infrastructure(format!("node {} has no vSphere provider ID", node.name))
    })?;
    let datacenter = ctx.vsphere_config().datacenter.as_str();

    let reference = ctx
        .call("find VM", ctx.vim_client().find_vm_by_uuid(datacenter, &uuid))
        .await?
        .ok_or_else(|| {
            CheckError::Infrastructure(format!(
                "no VM with UUID {} found in datacenter {}",
                uuid, datacenter
            ))
        })?;

    let properties = ctx
        .call(
            "retrieve VM properties",
            ctx.vim_client().retrieve_properties(&reference, NODE_PROPERTIES),
        )
        .await?;

    debug!(node = %node.name, vm = %reference, "fetched VM properties");
    Ok(VirtualMachine::from_properties(reference, properties, NODE_PROPERTIES))
}

/// Run one check on its own task, bounded by the run deadline.
///
/// A check that starts after the deadline is still invoked, but gets a single
/// poll and every remote call it makes fails at once. It is recorded as a
/// timeout whatever it returns.
async fn execute<F>(ctx: &CheckContext, check: F) -> CheckOutcome
where
    F: Future<Output = Result<(), CheckError>> + Send + 'static,
{
    let started_late = ctx.is_expired();
    let deadline = ctx.deadline();
    let joined = tokio::spawn(async move { tokio::time::timeout_at(deadline, check).await }).await;

    if started_late {
        return CheckOutcome::Fail {
            kind: FailureKind::Timeout,
            message: format!(
                "run deadline of {}ms expired before the check started",
                ctx.timeout().as_millis()
            ),
        };
    }

    match joined {
        Ok(Ok(result)) => CheckOutcome::from(result),
        Ok(Err(_)) => CheckOutcome::Fail {
            kind: FailureKind::Timeout,
            message: format!("check exceeded the {}ms run timeout", ctx.timeout().as_millis()),
        },
        Err(err) if err.is_panic() => CheckOutcome::Fail {
            kind: FailureKind::Check,
            message: "check panicked during execution".to_string(),
        },
        Err(_) => CheckOutcome::Fail {
            kind: FailureKind::Check,
            message: "check task was cancelled".to_string(),
        },
    }
}

fn log_outcome(name: &str, node: Option<&str>, outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Pass => debug!(check = name, node, "check passed"),
        CheckOutcome::Fail { kind, message } => {
            warn!(check = name, node, kind = %kind, "check failed: {}", message)
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
