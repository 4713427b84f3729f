//! Safety validation gate
//!
//! A pluggable chain of independent checks that must unanimously pass
//! before any recommendation may execute. Checks run concurrently; a
//! single failure blocks execution entirely, and the overall risk is the
//! maximum across all checks. Collaborator unavailability while gathering
//! the validation context fails closed.

mod business_hours;
mod criticality;
mod dependency;
mod recent_change;

pub use business_hours::BusinessHoursCheck;
pub use criticality::CriticalityCheck;
pub use dependency::DependencyCheck;
pub use recent_change::RecentChangeCheck;

use crate::config::SafetyConfig;
use crate::models::{
    Recommendation, RiskLevel, SafetyCheckResult, WorkloadRef, WorkloadState,
};
use crate::providers::ClusterProvider;
use std::sync::Arc;
use tracing::{info, warn};

pub use async_trait::async_trait;

/// Everything a check may consult about the proposed change.
pub struct SafetyContext {
    pub workload: WorkloadRef,
    pub recommendation: Recommendation,
    pub state: WorkloadState,
    /// Workloads and external consumers that structurally depend on this
    /// one.
    pub dependents: Vec<String>,
    /// Validation time, unix seconds.
    pub now: i64,
    /// When the change takes effect; equals `now` for immediate actions.
    pub effective_at: i64,
}

/// One independent safety check.
#[async_trait]
pub trait SafetyCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, ctx: &SafetyContext) -> SafetyCheckResult;
}

/// Aggregate outcome of a validation run.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub results: Vec<SafetyCheckResult>,
}

impl ValidationOutcome {
    /// Overall pass requires every check to pass. No partial override.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Maximum risk across all checks.
    pub fn risk(&self) -> RiskLevel {
        self.results
            .iter()
            .map(|r| r.risk)
            .max()
            .unwrap_or(RiskLevel::Low)
    }

    pub fn failures(&self) -> Vec<SafetyCheckResult> {
        self.results.iter().filter(|r| !r.passed).cloned().collect()
    }
}

/// Runs the configured checks concurrently and ANDs their verdicts.
pub struct SafetyValidator {
    checks: Vec<Arc<dyn SafetyCheck>>,
}

impl SafetyValidator {
    pub fn new(checks: Vec<Arc<dyn SafetyCheck>>) -> Self {
        Self { checks }
    }

    /// The standard chain: criticality, dependency, business-hours,
    /// recent-change.
    pub fn with_default_checks(config: &SafetyConfig) -> Self {
        Self::new(vec![
            Arc::new(CriticalityCheck::new(
                config.blocking_labels.clone(),
                config.production_labels.clone(),
            )),
            Arc::new(DependencyCheck::new()),
            Arc::new(BusinessHoursCheck::new(config.business_hours.clone())),
            Arc::new(RecentChangeCheck::new(config.recent_change_cooldown_secs)),
        ])
    }

    /// Run all checks concurrently against a prepared context.
    pub async fn validate(&self, ctx: Arc<SafetyContext>) -> ValidationOutcome {
        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let check = check.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move { check.check(&ctx).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (handle, check) in handles.into_iter().zip(&self.checks) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    // A panicking check cannot vouch for safety.
                    warn!(check = check.name(), error = %e, "Safety check aborted");
                    results.push(SafetyCheckResult {
                        check_name: check.name().to_string(),
                        passed: false,
                        reason: format!("check aborted: {}", e),
                        risk: RiskLevel::High,
                    });
                }
            }
        }

        let outcome = ValidationOutcome { results };
        info!(
            passed = outcome.passed(),
            risk = %outcome.risk(),
            checks = outcome.results.len(),
            "Safety validation complete"
        );
        outcome
    }

    /// Gather context from the cluster provider and validate. Provider
    /// failures fail closed as a failed availability check.
    pub async fn validate_workload(
        &self,
        cluster: &dyn ClusterProvider,
        workload: &WorkloadRef,
        recommendation: &Recommendation,
        now: i64,
    ) -> ValidationOutcome {
        let state = match cluster.get_current_state(workload).await {
            Ok(state) => state,
            Err(e) => return Self::fail_closed(workload, &e.to_string()),
        };
        let dependents = match cluster.get_dependents(workload).await {
            Ok(dependents) => dependents,
            Err(e) => return Self::fail_closed(workload, &e.to_string()),
        };

        let ctx = Arc::new(SafetyContext {
            workload: workload.clone(),
            recommendation: recommendation.clone(),
            state,
            dependents,
            now,
            effective_at: now,
        });
        self.validate(ctx).await
    }

    fn fail_closed(workload: &WorkloadRef, reason: &str) -> ValidationOutcome {
        warn!(
            workload = %workload,
            reason = reason,
            "Cluster provider unavailable during validation, failing closed"
        );
        ValidationOutcome {
            results: vec![SafetyCheckResult {
                check_name: "collaborator_availability".to_string(),
                passed: false,
                reason: format!("safety cannot be confirmed: {}", reason),
                risk: RiskLevel::High,
            }],
        }
    }
}
