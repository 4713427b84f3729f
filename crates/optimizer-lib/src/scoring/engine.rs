//! Deterministic weighted idle scorer
//!
//! Combines four sub-scores (business activity, resource efficiency,
//! temporal deviation, dependency health) into an idle probability, and
//! derives a confidence from data volume and pattern consistency. Every
//! factor is inspectable through the returned breakdown.

use super::{IdleScorer, ScoringInput};
use crate::config::ScoringConfig;
use crate::models::{FactorBreakdown, IdleAnalysisResult};
use tracing::debug;

/// Confidence tiers by data volume: (min samples, min requests, min
/// coverage hours, base confidence).
const CONFIDENCE_TIERS: &[(usize, usize, f64, f64)] = &[
    (1000, 100, 24.0, 95.0),
    (500, 50, 12.0, 85.0),
    (100, 10, 6.0, 75.0),
];

/// Base confidence when no tier is met; such results are flagged as
/// insufficient data and capped here.
const INSUFFICIENT_DATA_CONFIDENCE: f64 = 60.0;

/// Temporal deviation lookup: deviation below the percentage maps to the
/// idle score.
const TEMPORAL_LOOKUP: &[(f64, f64)] = &[(10.0, 90.0), (30.0, 70.0), (70.0, 30.0)];
const TEMPORAL_FLOOR_SCORE: f64 = 10.0;

/// Neutral sub-score used when a factor has no data to speak from.
const NEUTRAL_SCORE: f64 = 50.0;

/// The deterministic weighted-sum idle scorer.
pub struct WeightedIdleScorer {
    config: ScoringConfig,
}

impl WeightedIdleScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Business-activity sub-score: share of traffic that is noise. No
    /// traffic at all is the strongest idle signal.
    fn business_activity_score(&self, input: &ScoringInput<'_>) -> f64 {
        let total = input.counts.total();
        if total == 0 {
            return 100.0;
        }
        let business_ratio = input.counts.business as f64 / total as f64;
        let mut score = 100.0 * (1.0 - business_ratio);
        if let Some(multiplier) = input.baseline.and_then(|b| b.revenue_multiplier) {
            score *= multiplier;
        }
        score.clamp(0.0, 100.0)
    }

    /// Resource-efficiency sub-score: current business-requests-per-CPU
    /// against the workload's own 30-day baseline. A ratio below 1 raises
    /// the idle score proportionally; no baseline is neutral.
    fn resource_efficiency_score(&self, input: &ScoringInput<'_>) -> f64 {
        let Some(baseline) = input.baseline else {
            return NEUTRAL_SCORE;
        };
        if baseline.requests_per_cpu_hour <= 0.0 {
            return NEUTRAL_SCORE;
        }

        let hours = input.window.hours();
        if hours <= 0.0 || input.samples.is_empty() {
            return NEUTRAL_SCORE;
        }
        let mean_cores = input
            .samples
            .iter()
            .map(|s| s.cpu_millicores)
            .sum::<f64>()
            / input.samples.len() as f64
            / 1000.0;
        let core_hours = mean_cores * hours;
        // A workload consuming no CPU serves no requests per CPU either.
        let current_rate = if core_hours > 0.0 {
            input.counts.business as f64 / core_hours
        } else {
            0.0
        };

        let ratio = current_rate / baseline.requests_per_cpu_hour;
        (100.0 * (1.0 - ratio)).clamp(0.0, 100.0)
    }

    /// Temporal-pattern sub-score: current activity against the expected
    /// level for this time of window, via a fixed deviation lookup.
    fn temporal_pattern_score(&self, input: &ScoringInput<'_>) -> f64 {
        let Some(profile) = input.profile else {
            return NEUTRAL_SCORE;
        };
        let midpoint = input.window.start + input.window.duration_secs() / 2;
        let expected_per_hour = profile.expected_at(midpoint);
        if expected_per_hour <= 0.0 {
            return NEUTRAL_SCORE;
        }

        let hours = input.window.hours();
        if hours <= 0.0 {
            return NEUTRAL_SCORE;
        }
        let current_per_hour = input.counts.business as f64 / hours;
        let deviation_pct = current_per_hour / expected_per_hour * 100.0;

        for (bound, score) in TEMPORAL_LOOKUP {
            if deviation_pct < *bound {
                return *score;
            }
        }
        TEMPORAL_FLOOR_SCORE
    }

    /// Dependency-health sub-score: healthy dependencies make the absence
    /// of activity harder to explain away. No declared dependencies
    /// contributes nothing.
    fn dependency_health_score(&self, input: &ScoringInput<'_>) -> f64 {
        if input.dependencies.is_empty() {
            return 0.0;
        }
        let healthy = input.dependencies.iter().filter(|d| d.healthy).count();
        100.0 * healthy as f64 / input.dependencies.len() as f64
    }

    fn confidence(&self, input: &ScoringInput<'_>) -> (f64, bool) {
        let samples = input.samples.len();
        let requests = input.counts.total();
        let coverage = coverage_hours(input);

        let base = CONFIDENCE_TIERS
            .iter()
            .find(|(s, r, h, _)| samples >= *s && requests >= *r && coverage >= *h)
            .map(|(_, _, _, c)| *c);

        match base {
            Some(base) => {
                let adjusted = base + self.consistency_adjustment(input);
                (adjusted.clamp(50.0, 99.0), false)
            }
            None => {
                // Insufficient data: flag it and cap confidence.
                let adjusted =
                    INSUFFICIENT_DATA_CONFIDENCE + self.consistency_adjustment(input);
                (
                    adjusted.clamp(50.0, INSUFFICIENT_DATA_CONFIDENCE),
                    true,
                )
            }
        }
    }

    /// +/-10 adjustment from how consistent the CPU series is, measured by
    /// its coefficient of variation.
    fn consistency_adjustment(&self, input: &ScoringInput<'_>) -> f64 {
        if input.samples.len() < 2 {
            return 0.0;
        }
        let values: Vec<f64> = input.samples.iter().map(|s| s.cpu_millicores).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if mean <= f64::EPSILON {
            return 0.0;
        }
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;
        let cv = variance.sqrt() / mean;
        let consistency = 1.0 - cv.min(1.0);
        (consistency - 0.5) * 20.0
    }
}

impl Default for WeightedIdleScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl IdleScorer for WeightedIdleScorer {
    fn score(&self, input: &ScoringInput<'_>) -> IdleAnalysisResult {
        let business_activity = self.business_activity_score(input);
        let resource_efficiency = self.resource_efficiency_score(input);
        let temporal_pattern = self.temporal_pattern_score(input);
        let dependency_health = self.dependency_health_score(input);

        let weighted = self.config.business_activity_weight * business_activity
            + self.config.resource_efficiency_weight * resource_efficiency
            + self.config.temporal_pattern_weight * temporal_pattern
            + self.config.dependency_health_weight * dependency_health;

        // A window with zero business requests is fully idle by definition,
        // whatever the remaining factors say.
        let no_business_traffic = input.counts.business == 0;
        let idle_probability = if no_business_traffic {
            100.0
        } else {
            weighted.clamp(0.0, 100.0)
        };

        let (confidence, insufficient_data) = self.confidence(input);

        let summary = summarize(
            &self.config,
            no_business_traffic,
            business_activity,
            resource_efficiency,
            temporal_pattern,
            dependency_health,
        );

        debug!(
            workload = %input.workload,
            idle_probability = idle_probability,
            confidence = confidence,
            insufficient_data = insufficient_data,
            "Scored workload"
        );

        IdleAnalysisResult {
            workload: input.workload.clone(),
            idle_probability,
            confidence,
            factors: FactorBreakdown {
                business_activity,
                resource_efficiency,
                temporal_pattern,
                dependency_health,
                summary,
            },
            insufficient_data,
            computed_at: input.window.end,
        }
    }
}

fn coverage_hours(input: &ScoringInput<'_>) -> f64 {
    let min = input.samples.iter().map(|s| s.timestamp).min();
    let max = input.samples.iter().map(|s| s.timestamp).max();
    match (min, max) {
        (Some(min), Some(max)) => (max - min).max(0) as f64 / 3600.0,
        _ => 0.0,
    }
}

/// Human-readable list of factors ordered by weighted contribution.
fn summarize(
    config: &ScoringConfig,
    no_business_traffic: bool,
    business_activity: f64,
    resource_efficiency: f64,
    temporal_pattern: f64,
    dependency_health: f64,
) -> String {
    let mut contributions = [
        (
            "business-activity",
            business_activity,
            config.business_activity_weight * business_activity,
        ),
        (
            "resource-efficiency",
            resource_efficiency,
            config.resource_efficiency_weight * resource_efficiency,
        ),
        (
            "temporal-pattern",
            temporal_pattern,
            config.temporal_pattern_weight * temporal_pattern,
        ),
        (
            "dependency-health",
            dependency_health,
            config.dependency_health_weight * dependency_health,
        ),
    ];
    contributions.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let factors = contributions
        .iter()
        .map(|(name, score, contribution)| {
            format!("{} {:.1} (contributes {:.1})", name, score, contribution)
        })
        .collect::<Vec<_>>()
        .join(", ");

    if no_business_traffic {
        format!("no business traffic in window; {}", factors)
    } else {
        factors
    }
}
