//! Historical baselines for idle scoring
//!
//! Holds the 30-day business-requests-per-CPU baseline, the 90-day
//! hour-of-day activity profile, and the optional revenue-correlation
//! multiplier per workload. Written by background profile maintenance,
//! read concurrently by analyses.

use crate::models::WorkloadRef;
use chrono::{DateTime, Timelike};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// 30-day efficiency baseline for one workload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkloadBaseline {
    /// Mean business requests per CPU core-hour.
    pub requests_per_cpu_hour: f64,
    /// Multiplier applied to the business-activity score when traffic is
    /// known to correlate with revenue.
    pub revenue_multiplier: Option<f64>,
}

/// 90-day activity profile: expected business requests per hour, by
/// hour of day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalProfile {
    expected_by_hour: [f64; 24],
}

impl TemporalProfile {
    pub fn new(expected_by_hour: [f64; 24]) -> Self {
        Self { expected_by_hour }
    }

    /// Flat profile with the same expected rate at every hour.
    pub fn flat(expected_per_hour: f64) -> Self {
        Self {
            expected_by_hour: [expected_per_hour; 24],
        }
    }

    /// Expected business requests per hour at the given unix timestamp.
    pub fn expected_at(&self, timestamp: i64) -> f64 {
        let hour = DateTime::from_timestamp(timestamp, 0)
            .map(|dt| dt.hour() as usize)
            .unwrap_or(0);
        self.expected_by_hour[hour.min(23)]
    }
}

/// Concurrent read-mostly registry of baselines and profiles.
pub struct BaselineStore {
    baselines: DashMap<WorkloadRef, WorkloadBaseline>,
    profiles: DashMap<WorkloadRef, TemporalProfile>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self {
            baselines: DashMap::new(),
            profiles: DashMap::new(),
        }
    }

    pub fn baseline(&self, workload: &WorkloadRef) -> Option<WorkloadBaseline> {
        self.baselines.get(workload).map(|b| *b)
    }

    pub fn profile(&self, workload: &WorkloadRef) -> Option<TemporalProfile> {
        self.profiles.get(workload).map(|p| p.clone())
    }

    pub fn set_baseline(&self, workload: WorkloadRef, baseline: WorkloadBaseline) {
        self.baselines.insert(workload, baseline);
    }

    pub fn set_profile(&self, workload: WorkloadRef, profile: TemporalProfile) {
        self.profiles.insert(workload, profile);
    }

    pub fn remove(&self, workload: &WorkloadRef) {
        self.baselines.remove(workload);
        self.profiles.remove(workload);
    }
}

impl Default for BaselineStore {
    fn default() -> Self {
        Self::new()
    }
}
