//! Result aggregation and reporting.
//!
//! Collects check results in the order the runners produce them and turns
//! them into a read-only [`Report`].

use crate::CheckError;
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name recorded when the node phase aborts because nodes could not be listed.
pub const NODE_PHASE_CHECK: &str = "ListNodes";

/// Which runner produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Cluster,
    Node,
    /// The node phase as a whole (node listing failed)
    NodePhase,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Cluster => write!(f, "cluster"),
            CheckKind::Node => write!(f, "node"),
            CheckKind::NodePhase => write!(f, "node phase"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// vSphere or Kubernetes unreachable, or a listing/lookup failed
    Infrastructure,
    /// The run deadline expired
    Timeout,
    /// A check's business rule was violated
    Check,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Infrastructure => write!(f, "InfrastructureError"),
            FailureKind::Timeout => write!(f, "TimeoutFailure"),
            FailureKind::Check => write!(f, "CheckFailure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Fail { kind: FailureKind, message: String },
}

impl CheckOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, CheckOutcome::Pass)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            CheckOutcome::Pass => None,
            CheckOutcome::Fail { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            CheckOutcome::Pass => None,
            CheckOutcome::Fail { message, .. } => Some(message),
        }
    }
}

impl From<&CheckError> for CheckOutcome {
    fn from(err: &CheckError) -> Self {
        CheckOutcome::Fail {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

impl From<Result<(), CheckError>> for CheckOutcome {
    fn from(result: Result<(), CheckError>) -> Self {
        match result {
            Ok(()) => CheckOutcome::Pass,
            Err(err) => CheckOutcome::from(&err),
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Pass => write!(f, "PASS"),
            CheckOutcome::Fail { kind, message } => write!(f, "FAIL ({}): {}", kind, message),
        }
    }
}

/// Outcome of one check against one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub kind: CheckKind,
    /// Node name for node checks, `None` otherwise
    pub node: Option<String>,
    pub outcome: CheckOutcome,
    pub duration_ms: u64,
}

impl CheckResult {
    pub fn cluster(name: impl Into<String>, outcome: CheckOutcome, duration_ms: u64) -> Self {
        CheckResult {
            name: name.into(),
            kind: CheckKind::Cluster,
            node: None,
            outcome,
            duration_ms,
        }
    }

    pub fn node(
        name: impl Into<String>,
        node: impl Into<String>,
        outcome: CheckOutcome,
        duration_ms: u64,
    ) -> Self {
        CheckResult {
            name: name.into(),
            kind: CheckKind::Node,
            node: Some(node.into()),
            outcome,
            duration_ms,
        }
    }

    pub fn node_phase(err: &CheckError, duration_ms: u64) -> Self {
        CheckResult {
            name: NODE_PHASE_CHECK.to_string(),
            kind: CheckKind::NodePhase,
            node: None,
            outcome: CheckOutcome::from(err),
            duration_ms,
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{} [{}]: {}", self.name, node, self.outcome),
            None => write!(f, "{}: {}", self.name, self.outcome),
        }
    }
}

/// Result summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub passed: u32,
    pub failed: u32,
    pub check_failures: u32,
    pub timeouts: u32,
    pub infrastructure_errors: u32,
    pub total: u32,
}

/// Ordered results of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Unix time the report was produced
    pub timestamp: u64,
    pub results: Vec<CheckResult>,
    pub total_duration_ms: u64,
}

impl Report {
    /// Calculate summary statistics
    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary::default();

        for result in &self.results {
            summary.total += 1;
            match result.outcome.failure_kind() {
                None => summary.passed += 1,
                Some(kind) => {
                    summary.failed += 1;
                    match kind {
                        FailureKind::Check => summary.check_failures += 1,
                        FailureKind::Timeout => summary.timeouts += 1,
                        FailureKind::Infrastructure => summary.infrastructure_errors += 1,
                    }
                }
            }
        }

        summary
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn cluster_results(&self) -> Vec<&CheckResult> {
        self.of_kind(CheckKind::Cluster)
    }

    pub fn node_results(&self) -> Vec<&CheckResult> {
        self.of_kind(CheckKind::Node)
    }

    pub fn results_for_node(&self, node: &str) -> Vec<&CheckResult> {
        self.results
            .iter()
            .filter(|r| r.node.as_deref() == Some(node))
            .collect()
    }

    /// Get only failed results
    pub fn failures(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| !r.outcome.is_pass()).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.outcome.is_pass())
    }

    /// The entry recorded when the node phase aborted, if it did.
    pub fn node_phase_failure(&self) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.kind == CheckKind::NodePhase)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn of_kind(&self, kind: CheckKind) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| r.kind == kind).collect()
    }
}

/// Result aggregator for collecting check results
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<CheckResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result; order of calls is the report order.
    pub fn add_result(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.outcome.is_pass())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Create final report
    pub fn into_report(self, total_duration_ms: u64) -> Report {
        Report {
            timestamp: unix_timestamp(),
            results: self.results,
            total_duration_ms,
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
