//! Criticality check
//!
//! Blocks optimizations on workloads carrying labels that mark them as
//! critical or production-tier. Critical labels block every recommendation
//! kind; production labels block disruptive kinds but allow right-sizing.

use super::{async_trait, SafetyCheck, SafetyContext};
use crate::config::LabelMatch;
use crate::models::{RecommendationKind, RiskLevel, SafetyCheckResult};

pub struct CriticalityCheck {
    blocking_labels: Vec<LabelMatch>,
    production_labels: Vec<LabelMatch>,
}

impl CriticalityCheck {
    pub fn new(blocking_labels: Vec<LabelMatch>, production_labels: Vec<LabelMatch>) -> Self {
        Self {
            blocking_labels,
            production_labels,
        }
    }

    fn matched<'a>(
        labels: &std::collections::BTreeMap<String, String>,
        matches: &'a [LabelMatch],
    ) -> Option<&'a LabelMatch> {
        matches
            .iter()
            .find(|m| labels.get(&m.key).map(|v| v == &m.value).unwrap_or(false))
    }
}

#[async_trait]
impl SafetyCheck for CriticalityCheck {
    fn name(&self) -> &'static str {
        "criticality"
    }

    async fn check(&self, ctx: &SafetyContext) -> SafetyCheckResult {
        if let Some(label) = Self::matched(&ctx.state.labels, &self.blocking_labels) {
            return SafetyCheckResult {
                check_name: self.name().to_string(),
                passed: false,
                reason: format!(
                    "workload carries {}={}, incompatible with any optimization",
                    label.key, label.value
                ),
                risk: RiskLevel::Critical,
            };
        }

        let disruptive = matches!(
            ctx.recommendation.kind,
            RecommendationKind::ZeroScale | RecommendationKind::ScheduleScale
        );
        if disruptive {
            if let Some(label) = Self::matched(&ctx.state.labels, &self.production_labels) {
                return SafetyCheckResult {
                    check_name: self.name().to_string(),
                    passed: false,
                    reason: format!(
                        "workload carries {}={}, incompatible with {}",
                        label.key, label.value, ctx.recommendation.kind
                    ),
                    risk: RiskLevel::High,
                };
            }
        }

        SafetyCheckResult {
            check_name: self.name().to_string(),
            passed: true,
            reason: "no criticality labels block this recommendation".to_string(),
            risk: RiskLevel::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::context;
    use super::*;
    use crate::config::SafetyConfig;

    fn check() -> CriticalityCheck {
        let config = SafetyConfig::default();
        CriticalityCheck::new(config.blocking_labels, config.production_labels)
    }

    #[tokio::test]
    async fn test_critical_tier_blocks_everything() {
        for kind in [
            RecommendationKind::ZeroScale,
            RecommendationKind::ScheduleScale,
            RecommendationKind::Resize,
        ] {
            let mut ctx = context(kind);
            ctx.state
                .labels
                .insert("tier".to_string(), "critical".to_string());
            let result = check().check(&ctx).await;
            assert!(!result.passed, "kind {kind}");
            assert_eq!(result.risk, RiskLevel::Critical);
        }
    }

    #[tokio::test]
    async fn test_production_blocks_disruptive_kinds_only() {
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.state
            .labels
            .insert("environment".to_string(), "production".to_string());
        assert!(!check().check(&ctx).await.passed);

        let mut ctx = context(RecommendationKind::Resize);
        ctx.state
            .labels
            .insert("environment".to_string(), "production".to_string());
        assert!(check().check(&ctx).await.passed);
    }

    #[tokio::test]
    async fn test_unlabeled_workload_passes() {
        let ctx = context(RecommendationKind::ZeroScale);
        let result = check().check(&ctx).await;
        assert!(result.passed);
        assert_eq!(result.risk, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_label_value_must_match() {
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.state
            .labels
            .insert("tier".to_string(), "backend".to_string());
        assert!(check().check(&ctx).await.passed);
    }
}
