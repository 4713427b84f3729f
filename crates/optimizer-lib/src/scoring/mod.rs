//! Idle scoring engine
//!
//! Turns windowed activity data into an idle probability with a
//! confidence grade. The scorer sits behind a trait so the weighted-sum
//! implementation can later be swapped for a trained model without
//! touching callers.

mod baseline;
mod engine;

pub use baseline::{BaselineStore, TemporalProfile, WorkloadBaseline};
pub use engine::WeightedIdleScorer;

use crate::models::{
    AnalysisWindow, DependencyStatus, IdleAnalysisResult, MetricSample, WorkloadRef,
};
use crate::store::RequestCounts;

/// Windowed evidence handed to a scorer for one workload.
pub struct ScoringInput<'a> {
    pub workload: WorkloadRef,
    pub window: AnalysisWindow,
    pub samples: &'a [MetricSample],
    pub counts: RequestCounts,
    pub dependencies: &'a [DependencyStatus],
    pub baseline: Option<WorkloadBaseline>,
    pub profile: Option<&'a TemporalProfile>,
}

/// Trait for idle-probability scoring implementations.
pub trait IdleScorer: Send + Sync {
    /// Score a workload's idleness over the given window.
    fn score(&self, input: &ScoringInput<'_>) -> IdleAnalysisResult;
}
