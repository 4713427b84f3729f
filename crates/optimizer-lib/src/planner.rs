//! Recommendation planner
//!
//! Merges an idle analysis with a cost breakdown into ranked, risk-labeled
//! recommendations. Rules are threshold-based and tunable; when none fires
//! the planner returns an empty list, which is a valid outcome rather than
//! an error.

use crate::config::PlannerConfig;
use crate::models::{
    AnalysisWindow, CostBreakdown, IdleAnalysisResult, Recommendation, RecommendationKind,
    RiskLevel,
};
use tracing::debug;

/// Threshold-rule planner producing recommendations ordered by savings.
pub struct RecommendationPlanner {
    config: PlannerConfig,
}

impl RecommendationPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Plan recommendations for one analyzed workload, ordered by
    /// descending estimated monthly savings.
    pub fn plan(
        &self,
        idle: &IdleAnalysisResult,
        cost: &CostBreakdown,
        window: &AnalysisWindow,
    ) -> Vec<Recommendation> {
        let hours = window.hours();
        if hours <= 0.0 {
            return Vec::new();
        }
        let monthly_allocated = cost.allocated_cost / hours * self.config.hours_per_month;
        let monthly_waste = cost.wasted_cost / hours * self.config.hours_per_month;

        let mut recommendations = Vec::new();

        if idle.idle_probability > self.config.zero_scale_idle_threshold
            && idle.confidence > self.config.zero_scale_confidence_threshold
        {
            recommendations.push(Recommendation {
                kind: RecommendationKind::ZeroScale,
                action: format!(
                    "Scale {} to zero replicas during confirmed idle periods",
                    idle.workload
                ),
                estimated_monthly_savings: monthly_allocated * idle.idle_probability / 100.0,
                confidence: idle.confidence,
                risk: RiskLevel::Medium,
            });
        } else if idle.idle_probability >= self.config.schedule_scale_lower_bound
            && idle.idle_probability <= self.config.zero_scale_idle_threshold
        {
            recommendations.push(Recommendation {
                kind: RecommendationKind::ScheduleScale,
                action: format!(
                    "Scale {} down outside business hours on a schedule",
                    idle.workload
                ),
                estimated_monthly_savings: monthly_waste * self.config.off_hours_savings_fraction,
                confidence: idle.confidence,
                risk: RiskLevel::Low,
            });
        }

        if idle.factors.resource_efficiency > self.config.resize_efficiency_threshold
            && idle.idle_probability < self.config.schedule_scale_lower_bound
        {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Resize,
                action: format!(
                    "Right-size resource requests for {} to observed usage",
                    idle.workload
                ),
                estimated_monthly_savings: monthly_waste * self.config.resize_savings_fraction,
                confidence: idle.confidence,
                risk: RiskLevel::Low,
            });
        }

        recommendations.sort_by(|a, b| {
            b.estimated_monthly_savings
                .partial_cmp(&a.estimated_monthly_savings)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            workload = %idle.workload,
            count = recommendations.len(),
            "Planned recommendations"
        );

        recommendations
    }
}

impl Default for RecommendationPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}
