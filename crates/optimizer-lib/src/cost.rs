//! Cost attribution engine
//!
//! Maps a workload's share of its node's real hourly cost into allocated,
//! actual, and wasted figures over an analysis window. When the billing
//! provider has no rate for the node, the engine degrades to a specs-based
//! estimate instead of failing.

use crate::config::CostConfig;
use crate::models::{AnalysisWindow, CostBreakdown, MetricSample, PricingSource, WorkloadRef, WorkloadState};
use crate::providers::BillingProvider;
use std::sync::Arc;
use tracing::{debug, warn};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Attributes node cost to workloads by requested-resource fraction.
pub struct CostAttributor {
    config: CostConfig,
    billing: Arc<dyn BillingProvider>,
}

impl CostAttributor {
    pub fn new(config: CostConfig, billing: Arc<dyn BillingProvider>) -> Self {
        Self { config, billing }
    }

    /// Attribute cost for a workload over a window, given its current
    /// state and the window's usage samples.
    pub async fn attribute(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
        state: &WorkloadState,
        samples: &[MetricSample],
    ) -> CostBreakdown {
        let (node_rate, pricing) = self.node_rate(workload, window, state).await;

        let fraction = self.resource_fraction(state);
        let hours = window.hours();
        let allocated_cost = node_rate * fraction * hours;

        let efficiency = self.utilization_efficiency(state, samples);
        let actual_cost = allocated_cost * efficiency;
        // efficiency is clamped to [0, 1], so waste cannot go negative;
        // the max guards float round-off.
        let wasted_cost = (allocated_cost - actual_cost).max(0.0);

        let hourly_rate = node_rate * fraction;

        debug!(
            workload = %workload,
            allocated = allocated_cost,
            wasted = wasted_cost,
            pricing = ?pricing,
            "Attributed cost"
        );

        CostBreakdown {
            allocated_cost,
            actual_cost,
            wasted_cost,
            hourly_rate,
            pricing,
        }
    }

    /// Real node rate from billing, or the specs-based fallback.
    async fn node_rate(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
        state: &WorkloadState,
    ) -> (f64, PricingSource) {
        match self.billing.node_hourly_cost(&state.node, window).await {
            Ok(Some(rate)) => (rate, PricingSource::Measured),
            Ok(None) => {
                debug!(node = %state.node.name, "No billing rate for node, estimating from specs");
                (self.specs_estimate(state), PricingSource::Estimated)
            }
            Err(e) => {
                warn!(
                    workload = %workload,
                    node = %state.node.name,
                    error = %e,
                    "Billing provider unavailable, estimating from specs"
                );
                (self.specs_estimate(state), PricingSource::Estimated)
            }
        }
    }

    fn specs_estimate(&self, state: &WorkloadState) -> f64 {
        let vcpus = state.node.cpu_capacity_millicores as f64 / 1000.0;
        let gb = state.node.memory_capacity_bytes as f64 / BYTES_PER_GB;
        vcpus * self.config.fallback_vcpu_hourly_usd + gb * self.config.fallback_gb_hourly_usd
    }

    /// Requested share of the node: weighted CPU and memory fractions.
    fn resource_fraction(&self, state: &WorkloadState) -> f64 {
        let cpu_fraction = if state.node.cpu_capacity_millicores > 0 {
            state.cpu_request_millicores as f64 / state.node.cpu_capacity_millicores as f64
        } else {
            0.0
        };
        let mem_fraction = if state.node.memory_capacity_bytes > 0 {
            state.memory_request_bytes as f64 / state.node.memory_capacity_bytes as f64
        } else {
            0.0
        };
        (self.config.cpu_fraction_weight * cpu_fraction
            + self.config.memory_fraction_weight * mem_fraction)
            .clamp(0.0, 1.0)
    }

    /// Mean used-over-requested across the window's samples, weighted like
    /// the resource fraction and clamped to [0, 1]. No samples means no
    /// observed use.
    fn utilization_efficiency(&self, state: &WorkloadState, samples: &[MetricSample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let n = samples.len() as f64;

        let cpu_eff = if state.cpu_request_millicores > 0 {
            samples
                .iter()
                .map(|s| s.cpu_millicores / state.cpu_request_millicores as f64)
                .sum::<f64>()
                / n
        } else {
            0.0
        };
        let mem_eff = if state.memory_request_bytes > 0 {
            samples
                .iter()
                .map(|s| s.memory_bytes as f64 / state.memory_request_bytes as f64)
                .sum::<f64>()
                / n
        } else {
            0.0
        };

        (self.config.cpu_fraction_weight * cpu_eff.min(1.0)
            + self.config.memory_fraction_weight * mem_eff.min(1.0))
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, Result};
    use crate::models::NodeInfo;
    use crate::providers::async_trait;
    use std::collections::BTreeMap;

    struct FixedBilling(Option<f64>);

    #[async_trait]
    impl BillingProvider for FixedBilling {
        async fn node_hourly_cost(
            &self,
            _node: &NodeInfo,
            _window: &AnalysisWindow,
        ) -> Result<Option<f64>> {
            Ok(self.0)
        }
    }

    struct UnreachableBilling;

    #[async_trait]
    impl BillingProvider for UnreachableBilling {
        async fn node_hourly_cost(
            &self,
            _node: &NodeInfo,
            _window: &AnalysisWindow,
        ) -> Result<Option<f64>> {
            Err(EngineError::BillingUnavailable("connection refused".to_string()))
        }
    }

    fn state() -> WorkloadState {
        WorkloadState {
            replica_count: 2,
            cpu_request_millicores: 1000,
            memory_request_bytes: 4 * 1024 * 1024 * 1024,
            labels: BTreeMap::new(),
            node: NodeInfo {
                name: "node-1".to_string(),
                cpu_capacity_millicores: 8000,
                memory_capacity_bytes: 32 * 1024 * 1024 * 1024,
            },
            last_modified: 1_700_000_000,
        }
    }

    fn samples(cpu_millicores: f64, memory_bytes: u64, count: usize) -> Vec<MetricSample> {
        (0..count)
            .map(|i| MetricSample {
                timestamp: 1_700_000_000 + i as i64 * 60,
                cpu_millicores,
                memory_bytes,
                network_rx_bytes: 0,
                network_tx_bytes: 0,
            })
            .collect()
    }

    fn workload() -> WorkloadRef {
        WorkloadRef::new("api", "shop", "prod")
    }

    fn window_24h() -> AnalysisWindow {
        AnalysisWindow::last_hours(1_700_100_000, 24)
    }

    #[tokio::test]
    async fn test_measured_attribution() {
        let attributor = CostAttributor::new(CostConfig::default(), Arc::new(FixedBilling(Some(1.0))));
        let state = state();
        // 0.6 * (1000/8000) + 0.4 * (4/32) = 0.075 + 0.05 = 0.125
        let s = samples(500.0, 2 * 1024 * 1024 * 1024, 100);
        let breakdown = attributor
            .attribute(&workload(), &window_24h(), &state, &s)
            .await;

        assert_eq!(breakdown.pricing, PricingSource::Measured);
        assert!((breakdown.allocated_cost - 1.0 * 0.125 * 24.0).abs() < 1e-9);
        // efficiency = 0.6*0.5 + 0.4*0.5 = 0.5
        assert!((breakdown.actual_cost - breakdown.allocated_cost * 0.5).abs() < 1e-9);
        assert!(
            (breakdown.wasted_cost - (breakdown.allocated_cost - breakdown.actual_cost)).abs()
                < 1e-9
        );
        assert!((breakdown.hourly_rate - 0.125).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_wasted_cost_never_negative() {
        let attributor = CostAttributor::new(CostConfig::default(), Arc::new(FixedBilling(Some(2.5))));
        let state = state();
        // Usage far above requests still cannot push efficiency past 1.
        for (cpu, mem) in [
            (0.0, 0u64),
            (500.0, 1024 * 1024 * 1024),
            (5000.0, 64 * 1024 * 1024 * 1024),
        ] {
            let s = samples(cpu, mem, 50);
            let breakdown = attributor
                .attribute(&workload(), &window_24h(), &state, &s)
                .await;
            assert!(
                breakdown.wasted_cost >= 0.0,
                "wasted {} for cpu {cpu}",
                breakdown.wasted_cost
            );
            assert!(
                (breakdown.wasted_cost - (breakdown.allocated_cost - breakdown.actual_cost)).abs()
                    < 1e-9
            );
        }
    }

    #[tokio::test]
    async fn test_billing_rate_missing_falls_back_to_estimate() {
        let attributor = CostAttributor::new(CostConfig::default(), Arc::new(FixedBilling(None)));
        let state = state();
        let s = samples(500.0, 2 * 1024 * 1024 * 1024, 10);
        let breakdown = attributor
            .attribute(&workload(), &window_24h(), &state, &s)
            .await;

        assert_eq!(breakdown.pricing, PricingSource::Estimated);
        // 8 vCPU * 0.024 + 32 GB * 0.0032 = 0.192 + 0.1024
        let expected_rate = 8.0 * 0.024 + 32.0 * 0.0032;
        assert!((breakdown.allocated_cost - expected_rate * 0.125 * 24.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_billing_error_falls_back_without_surfacing() {
        let attributor = CostAttributor::new(CostConfig::default(), Arc::new(UnreachableBilling));
        let state = state();
        let s = samples(500.0, 2 * 1024 * 1024 * 1024, 10);
        let breakdown = attributor
            .attribute(&workload(), &window_24h(), &state, &s)
            .await;
        assert_eq!(breakdown.pricing, PricingSource::Estimated);
        assert!(breakdown.allocated_cost > 0.0);
    }

    #[tokio::test]
    async fn test_no_samples_means_full_waste() {
        let attributor = CostAttributor::new(CostConfig::default(), Arc::new(FixedBilling(Some(1.0))));
        let state = state();
        let breakdown = attributor
            .attribute(&workload(), &window_24h(), &state, &[])
            .await;
        assert!((breakdown.actual_cost).abs() < 1e-9);
        assert!((breakdown.wasted_cost - breakdown.allocated_cost).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_zero_capacity_node_attributes_nothing() {
        let attributor = CostAttributor::new(CostConfig::default(), Arc::new(FixedBilling(Some(1.0))));
        let mut state = state();
        state.node.cpu_capacity_millicores = 0;
        state.node.memory_capacity_bytes = 0;
        let s = samples(500.0, 2 * 1024 * 1024 * 1024, 10);
        let breakdown = attributor
            .attribute(&workload(), &window_24h(), &state, &s)
            .await;
        assert!((breakdown.allocated_cost).abs() < 1e-9);
        assert!((breakdown.wasted_cost).abs() < 1e-9);
    }
}
