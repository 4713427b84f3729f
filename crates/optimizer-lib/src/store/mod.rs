//! Metrics & activity store
//!
//! Retains per-workload metric samples and classified request records for a
//! bounded rolling window and serves the windowed queries every component
//! above it consumes. Requests are classified once at ingest; swapping in a
//! classifier with a bumped rules version triggers lazy reclassification on
//! the next read.

mod series;


pub use series::{RequestSeries, SampleSeries};

use crate::classifier::RequestClassifier;
use crate::config::StoreConfig;
use crate::models::{AnalysisWindow, MetricSample, RequestClass, RequestRecord, WorkloadRef};
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Counts of classified requests inside a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub business: usize,
    pub noise: usize,
}

impl RequestCounts {
    pub fn total(&self) -> usize {
        self.business + self.noise
    }
}

struct WorkloadSeries {
    metrics: SampleSeries,
    requests: RequestSeries,
}

/// Concurrent store of per-workload activity, keyed by `WorkloadRef`.
pub struct ActivityStore {
    config: StoreConfig,
    classifier: RwLock<Arc<RequestClassifier>>,
    workloads: DashMap<WorkloadRef, WorkloadSeries>,
}

impl ActivityStore {
    pub fn new(config: StoreConfig, classifier: Arc<RequestClassifier>) -> Self {
        Self {
            config,
            classifier: RwLock::new(classifier),
            workloads: DashMap::new(),
        }
    }

    /// Replace the classifier. Records cached under an older rules version
    /// are reclassified lazily on their next read.
    pub fn swap_classifier(&self, classifier: Arc<RequestClassifier>) {
        let mut guard = self.classifier.write().unwrap();
        debug!(
            old_version = guard.rules_version(),
            new_version = classifier.rules_version(),
            "Swapping classifier rules"
        );
        *guard = classifier;
    }

    fn classifier(&self) -> Arc<RequestClassifier> {
        self.classifier.read().unwrap().clone()
    }

    /// Append a metric sample. Samples are append-only; retention and
    /// compression advance with the sample's timestamp.
    pub fn record_sample(&self, workload: &WorkloadRef, sample: MetricSample) {
        let mut entry = self
            .workloads
            .entry(workload.clone())
            .or_insert_with(|| self.empty_series());
        entry.metrics.push(sample);
    }

    /// Append a request record, classifying it if it arrived unlabeled or
    /// labeled under stale rules.
    pub fn record_request(&self, workload: &WorkloadRef, mut record: RequestRecord) {
        let classifier = self.classifier();
        if record
            .classification
            .map(|c| !classifier.is_current(&c))
            .unwrap_or(true)
        {
            record.classification = Some(classifier.classification_for(&record));
        }
        let mut entry = self
            .workloads
            .entry(workload.clone())
            .or_insert_with(|| self.empty_series());
        entry.requests.push(record);
    }

    /// Metric samples for a workload inside the window.
    pub fn metrics_in(&self, workload: &WorkloadRef, window: &AnalysisWindow) -> Vec<MetricSample> {
        self.workloads
            .get(workload)
            .map(|series| series.metrics.query(window))
            .unwrap_or_default()
    }

    /// Classified request records for a workload inside the window. Records
    /// cached under a stale rules version are reclassified first.
    pub fn requests_in(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Vec<RequestRecord> {
        let Some(mut series) = self.workloads.get_mut(workload) else {
            return Vec::new();
        };

        let classifier = self.classifier();
        let mut reclassified = 0usize;
        for record in series.requests.records_mut() {
            let stale = record
                .classification
                .map(|c| !classifier.is_current(&c))
                .unwrap_or(true);
            if stale {
                record.classification = Some(classifier.classification_for(record));
                reclassified += 1;
            }
        }
        if reclassified > 0 {
            debug!(
                workload = %workload,
                count = reclassified,
                rules_version = classifier.rules_version(),
                "Reclassified stale request records"
            );
        }

        series.requests.query(window)
    }

    /// Business/noise counts for a workload inside the window.
    pub fn request_counts(&self, workload: &WorkloadRef, window: &AnalysisWindow) -> RequestCounts {
        let mut counts = RequestCounts::default();
        for record in self.requests_in(workload, window) {
            match record.classification.map(|c| c.class) {
                Some(RequestClass::Business) => counts.business += 1,
                Some(RequestClass::Noise) => counts.noise += 1,
                None => {}
            }
        }
        counts
    }

    /// Hours of metric coverage retained for a workload.
    pub fn coverage_hours(&self, workload: &WorkloadRef) -> f64 {
        self.workloads
            .get(workload)
            .map(|series| series.metrics.coverage_hours())
            .unwrap_or(0.0)
    }

    /// Number of workloads with retained data.
    pub fn tracked_workloads(&self) -> usize {
        self.workloads.len()
    }

    /// Drop all retained data for a workload.
    pub fn evict(&self, workload: &WorkloadRef) {
        self.workloads.remove(workload);
    }

    fn empty_series(&self) -> WorkloadSeries {
        WorkloadSeries {
            metrics: SampleSeries::new(
                self.config.retention_days,
                self.config.compression_after_hours,
            ),
            requests: RequestSeries::new(self.config.retention_days),
        }
    }
}
