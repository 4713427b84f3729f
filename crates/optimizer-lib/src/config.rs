//! Engine configuration
//!
//! Every threshold the engine consults lives here rather than being
//! hard-coded: business hours, cooldowns, monitoring windows, scoring
//! weights, planner thresholds, retention, and fallback pricing.

use chrono::{DateTime, Datelike, Timelike};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration, aggregating per-component sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Retention policy for the metrics & activity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Samples and requests older than this are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Samples older than this are compressed to hourly averages.
    #[serde(default = "default_compression_after_hours")]
    pub compression_after_hours: u32,
}

fn default_retention_days() -> u32 {
    90
}

fn default_compression_after_hours() -> u32 {
    24
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            compression_after_hours: default_compression_after_hours(),
        }
    }
}

/// Rule sets for the request classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// Exact path matches considered infrastructure noise.
    #[serde(default = "default_noise_paths")]
    pub noise_paths: Vec<String>,
    /// Case-insensitive user-agent prefixes of known probes.
    #[serde(default = "default_probe_agent_prefixes")]
    pub probe_agent_prefixes: Vec<String>,
    /// Source identities belonging to monitoring systems.
    #[serde(default)]
    pub monitoring_identities: Vec<String>,
}

fn default_noise_paths() -> Vec<String> {
    [
        "/health", "/healthz", "/ping", "/metrics", "/status", "/ready", "/readyz", "/live",
        "/livez",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_probe_agent_prefixes() -> Vec<String> {
    [
        "kube-probe/",
        "GoogleHC/",
        "ELB-HealthChecker/",
        "Prometheus/",
        "Blackbox Exporter/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            noise_paths: default_noise_paths(),
            probe_agent_prefixes: default_probe_agent_prefixes(),
            monitoring_identities: Vec::new(),
        }
    }
}

/// Weights for the idle score's four factors. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    #[serde(default = "default_business_activity_weight")]
    pub business_activity_weight: f64,
    #[serde(default = "default_resource_efficiency_weight")]
    pub resource_efficiency_weight: f64,
    #[serde(default = "default_temporal_pattern_weight")]
    pub temporal_pattern_weight: f64,
    #[serde(default = "default_dependency_health_weight")]
    pub dependency_health_weight: f64,
}

fn default_business_activity_weight() -> f64 {
    0.50
}

fn default_resource_efficiency_weight() -> f64 {
    0.30
}

fn default_temporal_pattern_weight() -> f64 {
    0.15
}

fn default_dependency_health_weight() -> f64 {
    0.05
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            business_activity_weight: default_business_activity_weight(),
            resource_efficiency_weight: default_resource_efficiency_weight(),
            temporal_pattern_weight: default_temporal_pattern_weight(),
            dependency_health_weight: default_dependency_health_weight(),
        }
    }
}

/// Cost attribution parameters and fallback pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostConfig {
    /// CPU share of the resource fraction.
    #[serde(default = "default_cpu_fraction_weight")]
    pub cpu_fraction_weight: f64,
    /// Memory share of the resource fraction.
    #[serde(default = "default_memory_fraction_weight")]
    pub memory_fraction_weight: f64,
    /// Specs-based fallback: USD per vCPU-hour.
    #[serde(default = "default_fallback_vcpu_hourly_usd")]
    pub fallback_vcpu_hourly_usd: f64,
    /// Specs-based fallback: USD per GB-hour of memory.
    #[serde(default = "default_fallback_gb_hourly_usd")]
    pub fallback_gb_hourly_usd: f64,
}

fn default_cpu_fraction_weight() -> f64 {
    0.6
}

fn default_memory_fraction_weight() -> f64 {
    0.4
}

fn default_fallback_vcpu_hourly_usd() -> f64 {
    0.024
}

fn default_fallback_gb_hourly_usd() -> f64 {
    0.0032
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cpu_fraction_weight: default_cpu_fraction_weight(),
            memory_fraction_weight: default_memory_fraction_weight(),
            fallback_vcpu_hourly_usd: default_fallback_vcpu_hourly_usd(),
            fallback_gb_hourly_usd: default_fallback_gb_hourly_usd(),
        }
    }
}

/// Thresholds and savings fractions for the recommendation planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Idle probability above which zero-scale is proposed.
    #[serde(default = "default_zero_scale_idle_threshold")]
    pub zero_scale_idle_threshold: f64,
    /// Confidence required alongside the zero-scale idle threshold.
    #[serde(default = "default_zero_scale_confidence_threshold")]
    pub zero_scale_confidence_threshold: f64,
    /// Lower idle-probability bound for schedule-based scaling.
    #[serde(default = "default_schedule_scale_lower_bound")]
    pub schedule_scale_lower_bound: f64,
    /// Resource-efficiency sub-score above which a resize is proposed.
    #[serde(default = "default_resize_efficiency_threshold")]
    pub resize_efficiency_threshold: f64,
    /// Share of monthly waste recoverable by off-hours scaling.
    #[serde(default = "default_off_hours_savings_fraction")]
    pub off_hours_savings_fraction: f64,
    /// Share of monthly waste recoverable by right-sizing.
    #[serde(default = "default_resize_savings_fraction")]
    pub resize_savings_fraction: f64,
    #[serde(default = "default_hours_per_month")]
    pub hours_per_month: f64,
}

fn default_zero_scale_idle_threshold() -> f64 {
    95.0
}

fn default_zero_scale_confidence_threshold() -> f64 {
    90.0
}

fn default_schedule_scale_lower_bound() -> f64 {
    70.0
}

fn default_resize_efficiency_threshold() -> f64 {
    70.0
}

fn default_off_hours_savings_fraction() -> f64 {
    0.65
}

fn default_resize_savings_fraction() -> f64 {
    0.5
}

fn default_hours_per_month() -> f64 {
    730.0
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            zero_scale_idle_threshold: default_zero_scale_idle_threshold(),
            zero_scale_confidence_threshold: default_zero_scale_confidence_threshold(),
            schedule_scale_lower_bound: default_schedule_scale_lower_bound(),
            resize_efficiency_threshold: default_resize_efficiency_threshold(),
            off_hours_savings_fraction: default_off_hours_savings_fraction(),
            resize_savings_fraction: default_resize_savings_fraction(),
            hours_per_month: default_hours_per_month(),
        }
    }
}

/// A `key=value` label match used by the criticality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatch {
    pub key: String,
    pub value: String,
}

impl LabelMatch {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Business-hours window during which disruptive actions are blocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    /// Inclusive start hour, 0-23.
    #[serde(default = "default_business_start_hour")]
    pub start_hour: u32,
    /// Exclusive end hour, 0-23.
    #[serde(default = "default_business_end_hour")]
    pub end_hour: u32,
    /// Active weekdays, 1 = Monday .. 7 = Sunday.
    #[serde(default = "default_business_days")]
    pub days: Vec<u32>,
    /// Offset from UTC in hours for the workload's locale.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

fn default_business_start_hour() -> u32 {
    8
}

fn default_business_end_hour() -> u32 {
    18
}

fn default_business_days() -> Vec<u32> {
    vec![1, 2, 3, 4, 5]
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: default_business_start_hour(),
            end_hour: default_business_end_hour(),
            days: default_business_days(),
            utc_offset_hours: 0,
        }
    }
}

impl BusinessHours {
    /// Whether the given unix timestamp falls inside business hours.
    pub fn contains(&self, timestamp: i64) -> bool {
        let shifted = timestamp + self.utc_offset_hours as i64 * 3600;
        let Some(dt) = DateTime::from_timestamp(shifted, 0) else {
            return false;
        };
        let day = dt.weekday().number_from_monday();
        let hour = dt.hour();
        self.days.contains(&day) && hour >= self.start_hour && hour < self.end_hour
    }
}

/// Safety validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyConfig {
    /// Labels that block every recommendation kind.
    #[serde(default = "default_blocking_labels")]
    pub blocking_labels: Vec<LabelMatch>,
    /// Labels that block zero-scale and schedule-scale but allow resize.
    #[serde(default = "default_production_labels")]
    pub production_labels: Vec<LabelMatch>,
    #[serde(default)]
    pub business_hours: BusinessHours,
    /// Minimum age of the last workload modification.
    #[serde(default = "default_recent_change_cooldown_secs")]
    pub recent_change_cooldown_secs: u64,
}

fn default_blocking_labels() -> Vec<LabelMatch> {
    vec![LabelMatch::new("tier", "critical")]
}

fn default_production_labels() -> Vec<LabelMatch> {
    vec![
        LabelMatch::new("environment", "production"),
        LabelMatch::new("env", "production"),
    ]
}

fn default_recent_change_cooldown_secs() -> u64 {
    24 * 3600
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            blocking_labels: default_blocking_labels(),
            production_labels: default_production_labels(),
            business_hours: BusinessHours::default(),
            recent_change_cooldown_secs: default_recent_change_cooldown_secs(),
        }
    }
}

/// Execution controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Monitoring window after a zero-scale, in seconds.
    #[serde(default = "default_zero_scale_monitoring_secs")]
    pub zero_scale_monitoring_secs: u64,
    /// Monitoring window after a schedule change, in seconds.
    #[serde(default = "default_schedule_scale_monitoring_secs")]
    pub schedule_scale_monitoring_secs: u64,
    /// Monitoring window after a resize, in seconds.
    #[serde(default = "default_resize_monitoring_secs")]
    pub resize_monitoring_secs: u64,
    /// Interval between rollback-signal probes during monitoring.
    #[serde(default = "default_monitor_poll_interval_secs")]
    pub monitor_poll_interval_secs: u64,
    /// Bounded rollback attempts before escalating to `Failed`.
    #[serde(default = "default_rollback_max_attempts")]
    pub rollback_max_attempts: u32,
    /// Error-rate above which monitoring triggers rollback.
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    /// p95 latency in milliseconds above which monitoring triggers rollback.
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: f64,
}

fn default_zero_scale_monitoring_secs() -> u64 {
    5 * 60
}

fn default_schedule_scale_monitoring_secs() -> u64 {
    5 * 60
}

fn default_resize_monitoring_secs() -> u64 {
    10 * 60
}

fn default_monitor_poll_interval_secs() -> u64 {
    15
}

fn default_rollback_max_attempts() -> u32 {
    3
}

fn default_error_rate_threshold() -> f64 {
    0.05
}

fn default_latency_threshold_ms() -> f64 {
    500.0
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            zero_scale_monitoring_secs: default_zero_scale_monitoring_secs(),
            schedule_scale_monitoring_secs: default_schedule_scale_monitoring_secs(),
            resize_monitoring_secs: default_resize_monitoring_secs(),
            monitor_poll_interval_secs: default_monitor_poll_interval_secs(),
            rollback_max_attempts: default_rollback_max_attempts(),
            error_rate_threshold: default_error_rate_threshold(),
            latency_threshold_ms: default_latency_threshold_ms(),
        }
    }
}

/// Analysis fan-out configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Worker-pool bound for concurrent per-workload analyses.
    #[serde(default = "default_max_concurrent_analyses")]
    pub max_concurrent_analyses: usize,
}

fn default_max_concurrent_analyses() -> usize {
    8
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: default_max_concurrent_analyses(),
        }
    }
}
