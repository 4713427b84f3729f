//! Dependency check
//!
//! Blocks optimizations on workloads that other workloads or external
//! consumers structurally depend on: service endpoints with external
//! references or service-mesh routing rules pointing at the workload.

use super::{async_trait, SafetyCheck, SafetyContext};
use crate::models::{RiskLevel, SafetyCheckResult};

pub struct DependencyCheck;

impl DependencyCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DependencyCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SafetyCheck for DependencyCheck {
    fn name(&self) -> &'static str {
        "dependency"
    }

    async fn check(&self, ctx: &SafetyContext) -> SafetyCheckResult {
        if ctx.dependents.is_empty() {
            return SafetyCheckResult {
                check_name: self.name().to_string(),
                passed: true,
                reason: "no structural dependents".to_string(),
                risk: RiskLevel::Low,
            };
        }

        let preview: Vec<&str> = ctx.dependents.iter().take(3).map(|s| s.as_str()).collect();
        SafetyCheckResult {
            check_name: self.name().to_string(),
            passed: false,
            reason: format!(
                "{} consumer(s) depend on this workload: {}",
                ctx.dependents.len(),
                preview.join(", ")
            ),
            risk: RiskLevel::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::context;
    use super::*;
    use crate::models::RecommendationKind;

    #[tokio::test]
    async fn test_no_dependents_passes() {
        let ctx = context(RecommendationKind::ZeroScale);
        let result = DependencyCheck::new().check(&ctx).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_dependents_block() {
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.dependents = vec![
            "mesh-route/checkout".to_string(),
            "endpoint/payments-gw".to_string(),
        ];
        let result = DependencyCheck::new().check(&ctx).await;
        assert!(!result.passed);
        assert_eq!(result.risk, RiskLevel::High);
        assert!(result.reason.contains("2 consumer(s)"));
        assert!(result.reason.contains("mesh-route/checkout"));
    }
}
