//! Recent-change check
//!
//! Blocks optimizations on workloads modified inside a cooldown window,
//! so the engine never compounds a fresh deployment or manual change.

use super::{async_trait, SafetyCheck, SafetyContext};
use crate::models::{RiskLevel, SafetyCheckResult};

pub struct RecentChangeCheck {
    cooldown_secs: u64,
}

impl RecentChangeCheck {
    pub fn new(cooldown_secs: u64) -> Self {
        Self { cooldown_secs }
    }
}

#[async_trait]
impl SafetyCheck for RecentChangeCheck {
    fn name(&self) -> &'static str {
        "recent_change"
    }

    async fn check(&self, ctx: &SafetyContext) -> SafetyCheckResult {
        let age_secs = (ctx.now - ctx.state.last_modified).max(0) as u64;
        if age_secs < self.cooldown_secs {
            return SafetyCheckResult {
                check_name: self.name().to_string(),
                passed: false,
                reason: format!(
                    "workload modified {}h ago, inside the {}h cooldown",
                    age_secs / 3600,
                    self.cooldown_secs / 3600
                ),
                risk: RiskLevel::Medium,
            };
        }

        SafetyCheckResult {
            check_name: self.name().to_string(),
            passed: true,
            reason: format!("last modified {}h ago", age_secs / 3600),
            risk: RiskLevel::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::context;
    use super::*;
    use crate::models::RecommendationKind;

    #[tokio::test]
    async fn test_recent_modification_blocks() {
        let check = RecentChangeCheck::new(24 * 3600);
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.state.last_modified = ctx.now - 2 * 3600;
        let result = check.check(&ctx).await;
        assert!(!result.passed);
        assert!(result.reason.contains("cooldown"));
    }

    #[tokio::test]
    async fn test_old_modification_passes() {
        let check = RecentChangeCheck::new(24 * 3600);
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.state.last_modified = ctx.now - 48 * 3600;
        assert!(check.check(&ctx).await.passed);
    }

    #[tokio::test]
    async fn test_boundary_is_exclusive() {
        let check = RecentChangeCheck::new(24 * 3600);
        let mut ctx = context(RecommendationKind::ZeroScale);
        ctx.state.last_modified = ctx.now - 24 * 3600;
        assert!(check.check(&ctx).await.passed);
    }
}
