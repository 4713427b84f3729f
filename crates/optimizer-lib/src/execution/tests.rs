//! Execution controller integration tests
//!
//! Drive the full submit/execute/monitor/rollback machine against a mock
//! cluster provider with controllable failures.

use super::*;
use crate::classifier::RequestClassifier;
use crate::config::{BusinessHours, ExecutionConfig, SafetyConfig};
use crate::error::{EngineError, Result};
use crate::models::*;
use crate::providers::{async_trait, ClusterProvider};
use crate::safety::SafetyValidator;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockCluster {
    state: Mutex<WorkloadState>,
    applied: Mutex<Vec<WorkloadChange>>,
    request_log: Mutex<Vec<RequestRecord>>,
    dependents: Mutex<Vec<String>>,
    fail_next_apply: AtomicBool,
    fail_all_applies: AtomicBool,
    fail_request_log: AtomicBool,
}

impl MockCluster {
    fn new() -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            state: Mutex::new(WorkloadState {
                replica_count: 2,
                cpu_request_millicores: 500,
                memory_request_bytes: 1024 * 1024 * 1024,
                labels: BTreeMap::new(),
                node: NodeInfo {
                    name: "node-1".to_string(),
                    cpu_capacity_millicores: 8000,
                    memory_capacity_bytes: 32 * 1024 * 1024 * 1024,
                },
                last_modified: now - 7 * 86400,
            }),
            applied: Mutex::new(Vec::new()),
            request_log: Mutex::new(Vec::new()),
            dependents: Mutex::new(Vec::new()),
            fail_next_apply: AtomicBool::new(false),
            fail_all_applies: AtomicBool::new(false),
            fail_request_log: AtomicBool::new(false),
        }
    }

    fn set_label(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(key.to_string(), value.to_string());
    }

    fn add_business_request(&self) {
        self.request_log.lock().unwrap().push(RequestRecord::new(
            chrono::Utc::now().timestamp(),
            "/api/orders",
            "10.0.0.9",
            "Mozilla/5.0",
        ));
    }

    fn applied_changes(&self) -> Vec<WorkloadChange> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterProvider for MockCluster {
    async fn get_metrics(
        &self,
        _workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Result<Vec<MetricSample>> {
        // Steady low usage across the window for resize targeting.
        Ok((0..20)
            .map(|i| MetricSample {
                timestamp: window.start + i * 60,
                cpu_millicores: 100.0,
                memory_bytes: 200 * 1024 * 1024,
                network_rx_bytes: 0,
                network_tx_bytes: 0,
            })
            .collect())
    }

    async fn get_request_log(
        &self,
        _workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Result<Vec<RequestRecord>> {
        if self.fail_request_log.load(Ordering::SeqCst) {
            return Err(EngineError::ClusterUnavailable(
                "request log unreachable".to_string(),
            ));
        }
        Ok(self
            .request_log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect())
    }

    async fn get_dependencies(&self, _workload: &WorkloadRef) -> Result<Vec<DependencyStatus>> {
        Ok(Vec::new())
    }

    async fn get_dependents(&self, _workload: &WorkloadRef) -> Result<Vec<String>> {
        Ok(self.dependents.lock().unwrap().clone())
    }

    async fn apply_change(
        &self,
        _workload: &WorkloadRef,
        change: &WorkloadChange,
    ) -> Result<()> {
        if self.fail_all_applies.load(Ordering::SeqCst)
            || self.fail_next_apply.swap(false, Ordering::SeqCst)
        {
            return Err(EngineError::ClusterUnavailable(
                "apply rejected".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        match change {
            WorkloadChange::ScaleReplicas { replicas } => state.replica_count = *replicas,
            WorkloadChange::Resize {
                cpu_request_millicores,
                memory_request_bytes,
            } => {
                state.cpu_request_millicores = *cpu_request_millicores;
                state.memory_request_bytes = *memory_request_bytes;
            }
            WorkloadChange::ApplySchedule { .. } => {}
        }
        self.applied.lock().unwrap().push(change.clone());
        Ok(())
    }

    async fn get_current_state(&self, _workload: &WorkloadRef) -> Result<WorkloadState> {
        Ok(self.state.lock().unwrap().clone())
    }
}

fn test_safety_config() -> SafetyConfig {
    // Empty business days keep submissions deterministic regardless of
    // when the test runs.
    SafetyConfig {
        business_hours: BusinessHours {
            days: vec![],
            ..BusinessHours::default()
        },
        ..SafetyConfig::default()
    }
}

fn test_execution_config(monitoring_secs: u64) -> ExecutionConfig {
    ExecutionConfig {
        zero_scale_monitoring_secs: monitoring_secs,
        schedule_scale_monitoring_secs: monitoring_secs,
        resize_monitoring_secs: monitoring_secs,
        monitor_poll_interval_secs: 1,
        ..ExecutionConfig::default()
    }
}

fn controller(cluster: Arc<MockCluster>, monitoring_secs: u64) -> Arc<ExecutionController> {
    let classifier = Arc::new(RequestClassifier::default());
    let config = test_execution_config(monitoring_secs);
    let monitor = Arc::new(ActivityRollbackMonitor::new(
        cluster.clone(),
        classifier,
        config.error_rate_threshold,
        config.latency_threshold_ms,
    ));
    let validator = Arc::new(SafetyValidator::with_default_checks(&test_safety_config()));
    Arc::new(ExecutionController::new(cluster, validator, monitor, config))
}

fn zero_scale_recommendation() -> Recommendation {
    Recommendation {
        kind: RecommendationKind::ZeroScale,
        action: "scale to zero".to_string(),
        estimated_monthly_savings: 420.0,
        confidence: 95.0,
        risk: RiskLevel::Medium,
    }
}

fn workload() -> WorkloadRef {
    WorkloadRef::new("api", "shop", "prod")
}

async fn wait_for_terminal(
    controller: &Arc<ExecutionController>,
    job_id: &str,
    timeout: Duration,
) -> OptimizationJob {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = controller.job_status(job_id).expect("job should exist");
        if job.state.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} stuck in {}",
            job_id,
            job.state
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_submit_validates_and_captures_rollback_plan() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 60);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Validated);
    let plan = job.rollback_plan.expect("plan captured at validation");
    assert_eq!(plan.prior_replica_count, 2);
    assert_eq!(plan.prior_cpu_request_millicores, 500);
    assert_eq!(plan.prior_memory_request_bytes, 1024 * 1024 * 1024);
    // nothing applied yet
    assert!(cluster.applied_changes().is_empty());
}

#[tokio::test]
async fn test_criticality_blocks_before_validated() {
    let cluster = Arc::new(MockCluster::new());
    cluster.set_label("tier", "critical");
    let controller = controller(cluster.clone(), 60);

    let err = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap_err();

    match err {
        EngineError::ValidationFailed { failures, .. } => {
            assert!(failures.iter().any(|f| f.check_name == "criticality"));
        }
        other => panic!("expected ValidationFailed, got {other}"),
    }
    // the claim was released and no job record remains
    assert_eq!(controller.arena().active_count(), 0);
    assert!(cluster.applied_changes().is_empty());
}

#[tokio::test]
async fn test_dependents_block_execution() {
    let cluster = Arc::new(MockCluster::new());
    cluster
        .dependents
        .lock()
        .unwrap()
        .push("mesh-route/checkout".to_string());
    let controller = controller(cluster.clone(), 60);

    let err = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ValidationFailed { .. }));
}

#[tokio::test]
async fn test_exclusivity_fails_fast() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 60);

    controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    let err = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JobAlreadyActive(_)));
}

#[tokio::test]
async fn test_clean_monitoring_window_completes() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 1);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    let job = controller.execute(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Monitoring);
    assert_eq!(
        cluster.applied_changes(),
        vec![WorkloadChange::ScaleReplicas { replicas: 0 }]
    );

    let job = wait_for_terminal(&controller, &job.id, Duration::from_secs(5)).await;
    assert_eq!(job.state, JobState::Completed);
    // the plan was discarded on success-confirmation
    assert!(job.rollback_plan.is_none());
    assert_eq!(controller.arena().active_count(), 0);
}

#[tokio::test]
async fn test_business_request_during_monitoring_rolls_back() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 5);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    let job = controller.execute(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Monitoring);
    assert_eq!(cluster.state.lock().unwrap().replica_count, 0);

    // A business request arrives while the workload is scaled down.
    cluster.add_business_request();

    let job = wait_for_terminal(&controller, &job.id, Duration::from_secs(10)).await;
    assert_eq!(job.state, JobState::RolledBack);
    assert!(job.failure_reason.unwrap().contains("business request"));

    // Prior replica count and requests restored exactly.
    let state = cluster.state.lock().unwrap().clone();
    assert_eq!(state.replica_count, 2);
    assert_eq!(state.cpu_request_millicores, 500);
    assert_eq!(state.memory_request_bytes, 1024 * 1024 * 1024);
    assert_eq!(controller.arena().active_count(), 0);
}

#[tokio::test]
async fn test_apply_failure_rolls_back_immediately() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 60);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    cluster.fail_next_apply.store(true, Ordering::SeqCst);

    let job = controller.execute(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::RolledBack);
    assert!(job.failure_reason.unwrap().contains("apply failed"));
    // restore went through after the single failure
    assert_eq!(cluster.state.lock().unwrap().replica_count, 2);
}

#[tokio::test]
async fn test_rollback_exhaustion_escalates_to_failed() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 60);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    // Every apply fails from here on: execution fails and so does each
    // rollback attempt.
    cluster.fail_all_applies.store(true, Ordering::SeqCst);

    let job = controller.execute(&job.id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    let reason = job.failure_reason.clone().unwrap();
    assert!(reason.contains("3 attempts"), "reason: {reason}");
    // the plan is preserved for manual remediation
    assert!(job.rollback_plan.is_some());
    assert_eq!(controller.arena().active_count(), 0);
}

#[tokio::test]
async fn test_monitoring_unavailable_fails_closed() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 5);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    let job = controller.execute(&job.id).await.unwrap();
    cluster.fail_request_log.store(true, Ordering::SeqCst);

    let job = wait_for_terminal(&controller, &job.id, Duration::from_secs(10)).await;
    assert_eq!(job.state, JobState::RolledBack);
    assert!(job
        .failure_reason
        .unwrap()
        .contains("monitoring unavailable"));
    assert_eq!(cluster.state.lock().unwrap().replica_count, 2);
}

#[tokio::test]
async fn test_cancel_validated_job_releases_claim() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 60);

    let job = controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .unwrap();
    controller.cancel(&job.id).unwrap();
    assert_eq!(controller.arena().active_count(), 0);

    // a fresh submission is accepted
    assert!(controller
        .submit(&workload(), &zero_scale_recommendation())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_resize_targets_observed_usage() {
    let cluster = Arc::new(MockCluster::new());
    let controller = controller(cluster.clone(), 1);

    let recommendation = Recommendation {
        kind: RecommendationKind::Resize,
        ..zero_scale_recommendation()
    };
    let job = controller.submit(&workload(), &recommendation).await.unwrap();
    controller.execute(&job.id).await.unwrap();

    let applied = cluster.applied_changes();
    match &applied[0] {
        WorkloadChange::Resize {
            cpu_request_millicores,
            memory_request_bytes,
        } => {
            // observed 100m / 200MB plus 20% headroom
            assert_eq!(*cpu_request_millicores, 120);
            assert_eq!(*memory_request_bytes, (200.0 * 1024.0 * 1024.0 * 1.2) as u64);
        }
        other => panic!("expected resize, got {other:?}"),
    }
}
