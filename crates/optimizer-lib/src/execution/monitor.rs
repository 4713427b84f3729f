//! Rollback-trigger monitoring
//!
//! Defines the signals that revert an applied change and the probe trait
//! the controller polls during the monitoring window. The bundled monitor
//! derives traffic signals from the request log; error-rate and latency
//! signals come from an optional service-stats source.

use crate::classifier::RequestClassifier;
use crate::error::Result;
use crate::models::{AnalysisWindow, RecommendationKind, RequestClass, WorkloadRef};
use crate::providers::ClusterProvider;
use std::fmt;
use std::sync::Arc;

pub use async_trait::async_trait;

/// A condition that triggers automatic rollback during monitoring.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackSignal {
    /// Business traffic arrived after a zero-scale.
    UnexpectedTraffic { business_requests: usize },
    /// Error rate exceeded the configured threshold.
    ErrorRateExceeded { rate: f64, threshold: f64 },
    /// p95 latency degraded past the configured threshold.
    LatencyDegraded { p95_ms: f64, threshold_ms: f64 },
}

impl fmt::Display for RollbackSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackSignal::UnexpectedTraffic { business_requests } => {
                write!(f, "{} business request(s) after scale-down", business_requests)
            }
            RollbackSignal::ErrorRateExceeded { rate, threshold } => {
                write!(f, "error rate {:.3} above threshold {:.3}", rate, threshold)
            }
            RollbackSignal::LatencyDegraded { p95_ms, threshold_ms } => {
                write!(f, "p95 latency {:.0}ms above threshold {:.0}ms", p95_ms, threshold_ms)
            }
        }
    }
}

/// Probe source for rollback-triggering signals.
#[async_trait]
pub trait RollbackMonitor: Send + Sync {
    /// Check for a trigger signal over the window since the change was
    /// applied. `None` means the change still looks safe.
    async fn probe(
        &self,
        workload: &WorkloadRef,
        kind: RecommendationKind,
        window: &AnalysisWindow,
    ) -> Result<Option<RollbackSignal>>;
}

/// Live service statistics for error/latency trigger evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ServiceStats {
    pub error_rate: f64,
    pub p95_latency_ms: f64,
}

/// Optional collaborator supplying live service statistics.
#[async_trait]
pub trait ServiceStatsSource: Send + Sync {
    async fn service_stats(&self, workload: &WorkloadRef) -> Result<Option<ServiceStats>>;
}

/// Default monitor: classifies the request log for unexpected business
/// traffic and consults a stats source, when wired, for error/latency
/// degradation.
pub struct ActivityRollbackMonitor {
    cluster: Arc<dyn ClusterProvider>,
    classifier: Arc<RequestClassifier>,
    stats: Option<Arc<dyn ServiceStatsSource>>,
    error_rate_threshold: f64,
    latency_threshold_ms: f64,
}

impl ActivityRollbackMonitor {
    pub fn new(
        cluster: Arc<dyn ClusterProvider>,
        classifier: Arc<RequestClassifier>,
        error_rate_threshold: f64,
        latency_threshold_ms: f64,
    ) -> Self {
        Self {
            cluster,
            classifier,
            stats: None,
            error_rate_threshold,
            latency_threshold_ms,
        }
    }

    pub fn with_stats_source(mut self, stats: Arc<dyn ServiceStatsSource>) -> Self {
        self.stats = Some(stats);
        self
    }
}

#[async_trait]
impl RollbackMonitor for ActivityRollbackMonitor {
    async fn probe(
        &self,
        workload: &WorkloadRef,
        kind: RecommendationKind,
        window: &AnalysisWindow,
    ) -> Result<Option<RollbackSignal>> {
        // Traffic check applies to scale-downs: a business request hitting
        // a scaled-down workload means it was not idle after all.
        if matches!(
            kind,
            RecommendationKind::ZeroScale | RecommendationKind::ScheduleScale
        ) {
            let log = self.cluster.get_request_log(workload, window).await?;
            let business = log
                .iter()
                .filter(|r| self.classifier.classify(r) == RequestClass::Business)
                .count();
            if business > 0 {
                return Ok(Some(RollbackSignal::UnexpectedTraffic {
                    business_requests: business,
                }));
            }
        }

        if let Some(stats_source) = &self.stats {
            if let Some(stats) = stats_source.service_stats(workload).await? {
                if stats.error_rate > self.error_rate_threshold {
                    return Ok(Some(RollbackSignal::ErrorRateExceeded {
                        rate: stats.error_rate,
                        threshold: self.error_rate_threshold,
                    }));
                }
                if stats.p95_latency_ms > self.latency_threshold_ms {
                    return Ok(Some(RollbackSignal::LatencyDegraded {
                        p95_ms: stats.p95_latency_ms,
                        threshold_ms: self.latency_threshold_ms,
                    }));
                }
            }
        }

        Ok(None)
    }
}
