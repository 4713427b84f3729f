//! Per-workload time-series with bounded retention
//!
//! Samples within the compression horizon are kept at full granularity;
//! older samples are rolled into hourly averages; everything past the
//! retention window is purged. Time advances with the newest ingested
//! timestamp, so the series never consults the wall clock.

use crate::models::{AnalysisWindow, MetricSample, RequestRecord};
use std::collections::VecDeque;

/// Metric samples for one workload: a raw recent tail plus an hourly
/// compressed history.
#[derive(Debug)]
pub struct SampleSeries {
    raw: VecDeque<MetricSample>,
    compressed: VecDeque<MetricSample>,
    retention_secs: i64,
    compression_after_secs: i64,
    latest: i64,
}

impl SampleSeries {
    pub fn new(retention_days: u32, compression_after_hours: u32) -> Self {
        Self {
            raw: VecDeque::new(),
            compressed: VecDeque::new(),
            retention_secs: retention_days as i64 * 86400,
            compression_after_secs: compression_after_hours as i64 * 3600,
            latest: 0,
        }
    }

    /// Append a sample and advance retention/compression. Samples at or
    /// before the high-water mark are dropped, so re-ingesting an
    /// overlapping window cannot duplicate history.
    pub fn push(&mut self, sample: MetricSample) {
        if sample.timestamp <= self.latest && !self.is_empty() {
            return;
        }
        self.latest = self.latest.max(sample.timestamp);
        self.raw.push_back(sample);
        self.roll();
    }

    /// Samples inside the window, compressed history first.
    pub fn query(&self, window: &AnalysisWindow) -> Vec<MetricSample> {
        self.compressed
            .iter()
            .chain(self.raw.iter())
            .filter(|s| window.contains(s.timestamp))
            .cloned()
            .collect()
    }

    /// Total retained samples, raw and compressed.
    pub fn len(&self) -> usize {
        self.raw.len() + self.compressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.compressed.is_empty()
    }

    /// Time span covered by retained samples, in hours.
    pub fn coverage_hours(&self) -> f64 {
        let oldest = self
            .compressed
            .front()
            .or_else(|| self.raw.front())
            .map(|s| s.timestamp);
        match oldest {
            Some(oldest) => (self.latest - oldest).max(0) as f64 / 3600.0,
            None => 0.0,
        }
    }

    fn roll(&mut self) {
        let compress_cutoff = self.latest - self.compression_after_secs;

        // Move raw samples past the horizon into hourly buckets.
        while let Some(front) = self.raw.front() {
            if front.timestamp >= compress_cutoff {
                break;
            }
            let hour = front.timestamp.div_euclid(3600);
            let mut bucket: Vec<MetricSample> = Vec::new();
            while let Some(front) = self.raw.front() {
                if front.timestamp.div_euclid(3600) != hour || front.timestamp >= compress_cutoff {
                    break;
                }
                match self.raw.pop_front() {
                    Some(sample) => bucket.push(sample),
                    None => break,
                }
            }
            if !bucket.is_empty() {
                self.compressed.push_back(compress_bucket(hour, &bucket));
            }
        }

        // Purge compressed history past retention.
        let retention_cutoff = self.latest - self.retention_secs;
        while let Some(front) = self.compressed.front() {
            if front.timestamp >= retention_cutoff {
                break;
            }
            self.compressed.pop_front();
        }
    }
}

/// Average gauges and sum counters over one hour of samples.
fn compress_bucket(hour: i64, bucket: &[MetricSample]) -> MetricSample {
    let n = bucket.len() as f64;
    MetricSample {
        timestamp: hour * 3600,
        cpu_millicores: bucket.iter().map(|s| s.cpu_millicores).sum::<f64>() / n,
        memory_bytes: (bucket.iter().map(|s| s.memory_bytes as f64).sum::<f64>() / n) as u64,
        network_rx_bytes: bucket.iter().map(|s| s.network_rx_bytes).sum(),
        network_tx_bytes: bucket.iter().map(|s| s.network_tx_bytes).sum(),
    }
}

/// Classified request records for one workload, purged past retention.
#[derive(Debug)]
pub struct RequestSeries {
    records: VecDeque<RequestRecord>,
    retention_secs: i64,
    latest: i64,
}

impl RequestSeries {
    pub fn new(retention_days: u32) -> Self {
        Self {
            records: VecDeque::new(),
            retention_secs: retention_days as i64 * 86400,
            latest: 0,
        }
    }

    /// Append a record. Records strictly before the high-water mark are
    /// dropped on re-ingest; same-second records are kept since requests
    /// legitimately share timestamps.
    pub fn push(&mut self, record: RequestRecord) {
        if record.timestamp < self.latest {
            return;
        }
        self.latest = self.latest.max(record.timestamp);
        self.records.push_back(record);

        let cutoff = self.latest - self.retention_secs;
        while let Some(front) = self.records.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.records.pop_front();
        }
    }

    pub fn query(&self, window: &AnalysisWindow) -> Vec<RequestRecord> {
        self.records
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect()
    }

    /// Mutable walk over retained records, used for reclassification.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut RequestRecord> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
