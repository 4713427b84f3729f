//! Business-hours check
//!
//! Blocks zero-scale and schedule-scale actions that would take effect
//! during the workload's configured business hours. Resizes keep capacity
//! available and are exempt.

use super::{async_trait, SafetyCheck, SafetyContext};
use crate::config::BusinessHours;
use crate::models::{RecommendationKind, RiskLevel, SafetyCheckResult};

pub struct BusinessHoursCheck {
    hours: BusinessHours,
}

impl BusinessHoursCheck {
    pub fn new(hours: BusinessHours) -> Self {
        Self { hours }
    }
}

#[async_trait]
impl SafetyCheck for BusinessHoursCheck {
    fn name(&self) -> &'static str {
        "business_hours"
    }

    async fn check(&self, ctx: &SafetyContext) -> SafetyCheckResult {
        if ctx.recommendation.kind == RecommendationKind::Resize {
            return SafetyCheckResult {
                check_name: self.name().to_string(),
                passed: true,
                reason: "resize keeps capacity available".to_string(),
                risk: RiskLevel::Low,
            };
        }

        if self.hours.contains(ctx.effective_at) {
            return SafetyCheckResult {
                check_name: self.name().to_string(),
                passed: false,
                reason: format!(
                    "{} would take effect during business hours ({:02}:00-{:02}:00)",
                    ctx.recommendation.kind, self.hours.start_hour, self.hours.end_hour
                ),
                risk: RiskLevel::Medium,
            };
        }

        SafetyCheckResult {
            check_name: self.name().to_string(),
            passed: true,
            reason: "takes effect outside business hours".to_string(),
            risk: RiskLevel::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::context;
    use super::*;

    // 2024-01-03 (Wednesday) 12:00 UTC
    const WED_NOON: i64 = 1704283200;

    #[tokio::test]
    async fn test_blocks_zero_scale_in_business_hours() {
        let check = BusinessHoursCheck::new(BusinessHours::default());
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.effective_at = WED_NOON;
        let result = check.check(&ctx).await;
        assert!(!result.passed);
        assert_eq!(result.risk, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_passes_outside_business_hours() {
        let check = BusinessHoursCheck::new(BusinessHours::default());
        let mut ctx = context(RecommendationKind::ScheduleScale);
        ctx.effective_at = WED_NOON + 10 * 3600; // 22:00
        assert!(check.check(&ctx).await.passed);
    }

    #[tokio::test]
    async fn test_resize_exempt() {
        let check = BusinessHoursCheck::new(BusinessHours::default());
        let mut ctx = context(RecommendationKind::Resize);
        ctx.effective_at = WED_NOON;
        assert!(check.check(&ctx).await.passed);
    }
}
