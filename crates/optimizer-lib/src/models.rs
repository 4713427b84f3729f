//! Core data models for the idle optimizer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a workload under analysis. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
    pub cluster: String,
}

impl WorkloadRef {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            cluster: cluster.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster, self.namespace, self.name)
    }
}

/// Half-open analysis window `[start, end)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: i64,
    pub end: i64,
}

impl AnalysisWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Window ending at `end` and spanning the previous `hours` hours.
    pub fn last_hours(end: i64, hours: i64) -> Self {
        Self {
            start: end - hours * 3600,
            end,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn hours(&self) -> f64 {
        self.duration_secs() as f64 / 3600.0
    }
}

/// A single resource usage sample. Append-only, owned by the activity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: i64,
    pub cpu_millicores: f64,
    pub memory_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

/// Label assigned to a request by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Real application traffic.
    Business,
    /// Health checks, probes, monitoring scrapes.
    Noise,
}

/// Cached classification with the rule-set version it was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub class: RequestClass,
    pub rules_version: u64,
}

/// One inbound request observed for a workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub timestamp: i64,
    pub path: String,
    pub source_identity: String,
    pub user_agent: String,
    /// Computed once by the classifier and cached; recomputed only when the
    /// classifier rules version changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl RequestRecord {
    pub fn new(
        timestamp: i64,
        path: impl Into<String>,
        source_identity: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            path: path.into(),
            source_identity: source_identity.into(),
            user_agent: user_agent.into(),
            classification: None,
        }
    }
}

/// Per-factor sub-scores and their weighted contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub business_activity: f64,
    pub resource_efficiency: f64,
    pub temporal_pattern: f64,
    pub dependency_health: f64,
    /// Human-readable summary of which factors dominated the score.
    pub summary: String,
}

/// Outcome of one idle analysis. Never mutated; superseded by a new result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleAnalysisResult {
    pub workload: WorkloadRef,
    /// Estimated likelihood, 0-100, that the workload is idle.
    pub idle_probability: f64,
    /// Statistical certainty, 0-100, in the estimate.
    pub confidence: f64,
    pub factors: FactorBreakdown,
    /// Set when the window held too little data for a reliable estimate;
    /// confidence is capped at 60 in that case.
    pub insufficient_data: bool,
    pub computed_at: i64,
}

/// Where the node hourly rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    /// Real rate from the billing provider.
    Measured,
    /// Specs-based fallback estimate.
    Estimated,
}

/// Monetary attribution for a workload over an analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub allocated_cost: f64,
    pub actual_cost: f64,
    /// `allocated_cost - actual_cost`, never negative.
    pub wasted_cost: f64,
    pub hourly_rate: f64,
    pub pricing: PricingSource,
}

/// Kind of optimization a recommendation proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendationKind {
    Resize,
    ScheduleScale,
    ZeroScale,
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationKind::Resize => write!(f, "resize"),
            RecommendationKind::ScheduleScale => write!(f, "scheduleScale"),
            RecommendationKind::ZeroScale => write!(f, "zeroScale"),
        }
    }
}

/// Risk grading for recommendations and safety check results.
///
/// Ordering follows severity, so the overall risk of a set of checks is
/// simply the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A proposed optimization, derived from an analysis cycle. Read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    /// Description of the concrete action to take.
    pub action: String,
    pub estimated_monthly_savings: f64,
    pub confidence: f64,
    pub risk: RiskLevel,
}

/// Result of a single safety check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheckResult {
    pub check_name: String,
    pub passed: bool,
    pub reason: String,
    pub risk: RiskLevel,
}

/// Snapshot of prior workload state, captured before any change is applied
/// and consumed by rollback or discarded on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackPlan {
    pub workload: WorkloadRef,
    pub prior_replica_count: u32,
    pub prior_cpu_request_millicores: u32,
    pub prior_memory_request_bytes: u64,
    pub prior_labels: BTreeMap<String, String>,
    pub captured_at: i64,
    /// Monitoring window after which the plan is discarded.
    pub timeout_secs: u64,
}

/// States of an optimization job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Pending,
    Validated,
    Executing,
    Monitoring,
    Completed,
    RolledBack,
    Failed,
}

impl JobState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::RolledBack | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Validated => write!(f, "validated"),
            JobState::Executing => write!(f, "executing"),
            JobState::Monitoring => write!(f, "monitoring"),
            JobState::Completed => write!(f, "completed"),
            JobState::RolledBack => write!(f, "rolledBack"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// State-machine instance tracking one optimization from validation through
/// execution, monitoring, and final outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationJob {
    pub id: String,
    pub workload: WorkloadRef,
    pub recommendation: Recommendation,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_plan: Option<RollbackPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Node hosting a workload, with capacity for cost attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub cpu_capacity_millicores: u32,
    pub memory_capacity_bytes: u64,
}

/// Live workload state as reported by the cluster provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadState {
    pub replica_count: u32,
    pub cpu_request_millicores: u32,
    pub memory_request_bytes: u64,
    pub labels: BTreeMap<String, String>,
    pub node: NodeInfo,
    /// Unix timestamp of the last spec modification.
    pub last_modified: i64,
}

/// Health of one declared dependency of a workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub name: String,
    pub healthy: bool,
}

/// Change payload handed to the cluster provider's `apply_change`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum WorkloadChange {
    /// Set the replica count (zero-scale uses replicas = 0).
    ScaleReplicas { replicas: u32 },
    /// Adjust resource requests.
    Resize {
        cpu_request_millicores: u32,
        memory_request_bytes: u64,
    },
    /// Install an off-hours scaling schedule.
    ApplySchedule { off_hours_replicas: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_ref_display() {
        let wl = WorkloadRef::new("api", "shop", "prod-eu");
        assert_eq!(wl.to_string(), "prod-eu/shop/api");
    }

    #[test]
    fn test_window_contains_half_open() {
        let w = AnalysisWindow::new(100, 200);
        assert!(w.contains(100));
        assert!(w.contains(199));
        assert!(!w.contains(200));
        assert!(!w.contains(99));
    }

    #[test]
    fn test_window_hours() {
        let w = AnalysisWindow::last_hours(7200, 2);
        assert_eq!(w.start, 0);
        assert!((w.hours() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        let max = [RiskLevel::Low, RiskLevel::High, RiskLevel::Medium]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(max, RiskLevel::High);
    }

    #[test]
    fn test_job_state_terminality() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Validated.is_terminal());
        assert!(!JobState::Executing.is_terminal());
        assert!(!JobState::Monitoring.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::RolledBack.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }
}
