//! Observability infrastructure for the idle optimizer
//!
//! Provides:
//! - Prometheus metrics (analysis latency, validation latency, job and
//!   rollback counters, tracked-workload gauges)
//! - Structured logging with tracing for analysis and job lifecycle events

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct EngineMetricsInner {
    analysis_latency_seconds: Histogram,
    validation_latency_seconds: Histogram,
    analyses_total: IntCounter,
    insufficient_data_total: IntCounter,
    recommendations_total: IntCounterVec,
    validation_failures_total: IntCounter,
    executions_total: IntCounter,
    rollbacks_total: IntCounter,
    rollback_failures_total: IntCounter,
    jobs_active: IntGauge,
    workloads_tracked: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            analysis_latency_seconds: register_histogram!(
                "idle_optimizer_analysis_latency_seconds",
                "Time spent analyzing a single workload",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            validation_latency_seconds: register_histogram!(
                "idle_optimizer_validation_latency_seconds",
                "Time spent running the safety check chain",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register validation_latency_seconds"),

            analyses_total: register_int_counter!(
                "idle_optimizer_analyses_total",
                "Total number of workload analyses performed"
            )
            .expect("Failed to register analyses_total"),

            insufficient_data_total: register_int_counter!(
                "idle_optimizer_insufficient_data_total",
                "Analyses flagged as having insufficient data"
            )
            .expect("Failed to register insufficient_data_total"),

            recommendations_total: register_int_counter_vec!(
                "idle_optimizer_recommendations_total",
                "Recommendations produced, by kind",
                &["kind"]
            )
            .expect("Failed to register recommendations_total"),

            validation_failures_total: register_int_counter!(
                "idle_optimizer_validation_failures_total",
                "Optimizations blocked by the safety validator"
            )
            .expect("Failed to register validation_failures_total"),

            executions_total: register_int_counter!(
                "idle_optimizer_executions_total",
                "Optimization changes applied to live workloads"
            )
            .expect("Failed to register executions_total"),

            rollbacks_total: register_int_counter!(
                "idle_optimizer_rollbacks_total",
                "Automatic rollbacks performed"
            )
            .expect("Failed to register rollbacks_total"),

            rollback_failures_total: register_int_counter!(
                "idle_optimizer_rollback_failures_total",
                "Rollbacks that exhausted their retries"
            )
            .expect("Failed to register rollback_failures_total"),

            jobs_active: register_int_gauge!(
                "idle_optimizer_jobs_active",
                "Non-terminal optimization jobs currently held"
            )
            .expect("Failed to register jobs_active"),

            workloads_tracked: register_int_gauge!(
                "idle_optimizer_workloads_tracked",
                "Workloads with retained activity data"
            )
            .expect("Failed to register workloads_tracked"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance. Multiple clones
/// share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner().analysis_latency_seconds.observe(duration_secs);
    }

    pub fn observe_validation_latency(&self, duration_secs: f64) {
        self.inner().validation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_analyses(&self) {
        self.inner().analyses_total.inc();
    }

    pub fn inc_insufficient_data(&self) {
        self.inner().insufficient_data_total.inc();
    }

    pub fn inc_recommendation(&self, kind: &str) {
        self.inner()
            .recommendations_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_validation_failures(&self) {
        self.inner().validation_failures_total.inc();
    }

    pub fn inc_executions(&self) {
        self.inner().executions_total.inc();
    }

    pub fn inc_rollbacks(&self) {
        self.inner().rollbacks_total.inc();
    }

    pub fn inc_rollback_failures(&self) {
        self.inner().rollback_failures_total.inc();
    }

    pub fn set_jobs_active(&self, count: i64) {
        self.inner().jobs_active.set(count);
    }

    pub fn set_workloads_tracked(&self, count: i64) {
        self.inner().workloads_tracked.set(count);
    }
}

/// Structured logger for engine events
///
/// Provides consistent field-style logging for analyses, recommendations,
/// and job lifecycle transitions.
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    /// Log a completed workload analysis
    pub fn log_analysis(
        &self,
        workload: &str,
        idle_probability: f64,
        confidence: f64,
        insufficient_data: bool,
        wasted_cost: f64,
        recommendations: usize,
    ) {
        info!(
            event = "workload_analyzed",
            cluster = %self.cluster,
            workload = %workload,
            idle_probability = idle_probability,
            confidence = confidence,
            insufficient_data = insufficient_data,
            wasted_cost = wasted_cost,
            recommendations = recommendations,
            "Workload analysis complete"
        );
    }

    /// Log a produced recommendation
    pub fn log_recommendation(
        &self,
        workload: &str,
        kind: &str,
        estimated_monthly_savings: f64,
        risk: &str,
    ) {
        info!(
            event = "recommendation_produced",
            cluster = %self.cluster,
            workload = %workload,
            kind = %kind,
            estimated_monthly_savings = estimated_monthly_savings,
            risk = %risk,
            "Produced optimization recommendation"
        );
    }

    /// Log a job state transition
    pub fn log_job_transition(&self, job_id: &str, workload: &str, from: &str, to: &str) {
        info!(
            event = "job_transition",
            cluster = %self.cluster,
            job_id = %job_id,
            workload = %workload,
            from = %from,
            to = %to,
            "Optimization job transition"
        );
    }

    /// Log a blocked optimization
    pub fn log_validation_failure(&self, workload: &str, failed_checks: &[String]) {
        warn!(
            event = "validation_failed",
            cluster = %self.cluster,
            workload = %workload,
            failed_checks = ?failed_checks,
            "Optimization blocked by safety validation"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "service_started",
            cluster = %self.cluster,
            service_version = %version,
            "Idle optimizer started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "Idle optimizer shutting down"
        );
    }

    /// Log an automatic rollback
    pub fn log_rollback(&self, job_id: &str, workload: &str, trigger: &str, restored: bool) {
        if restored {
            warn!(
                event = "rollback_completed",
                cluster = %self.cluster,
                job_id = %job_id,
                workload = %workload,
                trigger = %trigger,
                "Change rolled back and prior state restored"
            );
        } else {
            warn!(
                event = "rollback_failed",
                cluster = %self.cluster,
                job_id = %job_id,
                workload = %workload,
                trigger = %trigger,
                "Rollback exhausted retries, manual remediation required"
            );
        }
    }
}
