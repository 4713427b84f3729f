//! Collaborator interfaces consumed by the engine
//!
//! The cluster data provider and the billing provider are external
//! systems; the engine consumes their data through these traits and every
//! component receives its collaborators via constructor injection.

use crate::error::Result;
use crate::models::{
    AnalysisWindow, DependencyStatus, MetricSample, NodeInfo, RequestRecord, WorkloadChange,
    WorkloadRef, WorkloadState,
};

pub use async_trait::async_trait;

/// Source of cluster-side workload data and the apply/read surface for
/// optimizations.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Resource usage samples for a workload over a window.
    async fn get_metrics(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Result<Vec<MetricSample>>;

    /// Inbound request records for a workload over a window.
    async fn get_request_log(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Result<Vec<RequestRecord>>;

    /// Declared dependencies of the workload and their current health.
    async fn get_dependencies(&self, workload: &WorkloadRef) -> Result<Vec<DependencyStatus>>;

    /// Names of workloads or external consumers that structurally depend on
    /// this one (service endpoints with external references, mesh routing
    /// rules).
    async fn get_dependents(&self, workload: &WorkloadRef) -> Result<Vec<String>>;

    /// Apply a change to the live workload.
    async fn apply_change(&self, workload: &WorkloadRef, change: &WorkloadChange) -> Result<()>;

    /// Current replica count, resource requests, labels, and hosting node.
    async fn get_current_state(&self, workload: &WorkloadRef) -> Result<WorkloadState>;
}

/// Source of real node pricing.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Real hourly cost of a node over a window, or `None` when the billing
    /// system has no rate for it. Callers fall back to estimation on `None`
    /// and on transport errors alike.
    async fn node_hourly_cost(
        &self,
        node: &NodeInfo,
        window: &AnalysisWindow,
    ) -> Result<Option<f64>>;
}
