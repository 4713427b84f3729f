//! Execution & rollback controller
//!
//! Drives an approved optimization through the job state machine: capture
//! a rollback plan, apply the change, monitor for a bounded window, and
//! revert automatically on any trigger signal. Rollback is idempotent,
//! retried a bounded number of times, and confirmed against the live state
//! before the job goes terminal.

use super::jobs::JobArena;
use super::monitor::RollbackMonitor;
use crate::config::ExecutionConfig;
use crate::error::{EngineError, Result};
use crate::models::{
    AnalysisWindow, JobState, OptimizationJob, Recommendation, RecommendationKind, RollbackPlan,
    WorkloadChange, WorkloadRef,
};
use crate::observability::EngineMetrics;
use crate::providers::ClusterProvider;
use crate::safety::SafetyValidator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, sleep_until, Instant};
use tracing::{info, warn};

/// Headroom added to observed usage when right-sizing requests.
const RESIZE_HEADROOM: f64 = 0.20;

/// Floors for right-sized requests.
const MIN_CPU_MILLICORES: u32 = 10;
const MIN_MEMORY_BYTES: u64 = 64 * 1024 * 1024;

/// Delay between rollback attempts.
const ROLLBACK_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Applies approved optimizations and guards them with monitored rollback.
pub struct ExecutionController {
    cluster: Arc<dyn ClusterProvider>,
    validator: Arc<SafetyValidator>,
    monitor: Arc<dyn RollbackMonitor>,
    arena: Arc<JobArena>,
    config: ExecutionConfig,
    metrics: EngineMetrics,
}

impl ExecutionController {
    pub fn new(
        cluster: Arc<dyn ClusterProvider>,
        validator: Arc<SafetyValidator>,
        monitor: Arc<dyn RollbackMonitor>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            cluster,
            validator,
            monitor,
            arena: Arc::new(JobArena::new()),
            config,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn arena(&self) -> &Arc<JobArena> {
        &self.arena
    }

    /// Claim the workload, run the safety gate, and capture the rollback
    /// plan at the `Pending -> Validated` transition. A failing check
    /// blocks job creation entirely.
    pub async fn submit(
        &self,
        workload: &WorkloadRef,
        recommendation: &Recommendation,
    ) -> Result<OptimizationJob> {
        let now = chrono::Utc::now().timestamp();
        let job = self.arena.claim(workload, recommendation.clone(), now)?;
        self.metrics.set_jobs_active(self.arena.active_count() as i64);

        let started = Instant::now();
        let outcome = self
            .validator
            .validate_workload(self.cluster.as_ref(), workload, recommendation, now)
            .await;
        self.metrics
            .observe_validation_latency(started.elapsed().as_secs_f64());

        if !outcome.passed() {
            let _ = self.arena.cancel(&job.id);
            self.metrics.inc_validation_failures();
            self.metrics.set_jobs_active(self.arena.active_count() as i64);
            return Err(EngineError::ValidationFailed {
                workload: workload.to_string(),
                failures: outcome.failures(),
            });
        }

        // Plan capture must precede any change; a workload we cannot read
        // is a workload we must not touch.
        let state = match self.cluster.get_current_state(workload).await {
            Ok(state) => state,
            Err(e) => {
                let _ = self.arena.cancel(&job.id);
                self.metrics.set_jobs_active(self.arena.active_count() as i64);
                return Err(e);
            }
        };
        let plan = RollbackPlan {
            workload: workload.clone(),
            prior_replica_count: state.replica_count,
            prior_cpu_request_millicores: state.cpu_request_millicores,
            prior_memory_request_bytes: state.memory_request_bytes,
            prior_labels: state.labels,
            captured_at: now,
            timeout_secs: self.monitoring_secs(recommendation.kind),
        };

        let job = self.arena.transition(&job.id, JobState::Validated, now, |j| {
            j.rollback_plan = Some(plan)
        })?;
        info!(job_id = %job.id, workload = %workload, "Optimization validated");
        Ok(job)
    }

    /// Apply a validated job's change and begin monitoring. An apply error
    /// triggers an immediate rollback attempt.
    pub async fn execute(self: &Arc<Self>, job_id: &str) -> Result<OptimizationJob> {
        let now = chrono::Utc::now().timestamp();
        let job = self.arena.transition(job_id, JobState::Executing, now, |_| {})?;

        let change = match self.change_for(&job).await {
            Ok(change) => change,
            Err(e) => {
                self.finish_with_rollback(&job, format!("could not build change: {}", e))
                    .await;
                return self.arena.get(job_id);
            }
        };

        match self.cluster.apply_change(&job.workload, &change).await {
            Ok(()) => {
                self.metrics.inc_executions();
                let job = self
                    .arena
                    .transition(job_id, JobState::Monitoring, now, |_| {})?;
                info!(
                    job_id = %job.id,
                    workload = %job.workload,
                    window_secs = self.monitoring_secs(job.recommendation.kind),
                    "Change applied, monitoring window started"
                );
                let controller = Arc::clone(self);
                let id = job.id.clone();
                tokio::spawn(async move { controller.run_monitoring(id).await });
                Ok(job)
            }
            Err(e) => {
                self.finish_with_rollback(&job, format!("apply failed: {}", e))
                    .await;
                self.arena.get(job_id)
            }
        }
    }

    pub fn job_status(&self, job_id: &str) -> Result<OptimizationJob> {
        self.arena.get(job_id)
    }

    /// Cancel a job that has not started executing.
    pub fn cancel(&self, job_id: &str) -> Result<OptimizationJob> {
        let job = self.arena.cancel(job_id)?;
        self.metrics.set_jobs_active(self.arena.active_count() as i64);
        Ok(job)
    }

    fn monitoring_secs(&self, kind: RecommendationKind) -> u64 {
        match kind {
            RecommendationKind::ZeroScale => self.config.zero_scale_monitoring_secs,
            RecommendationKind::ScheduleScale => self.config.schedule_scale_monitoring_secs,
            RecommendationKind::Resize => self.config.resize_monitoring_secs,
        }
    }

    /// The concrete change for a recommendation. Right-sizing targets
    /// observed usage with headroom, floored to sane minimums.
    async fn change_for(&self, job: &OptimizationJob) -> Result<WorkloadChange> {
        match job.recommendation.kind {
            RecommendationKind::ZeroScale => Ok(WorkloadChange::ScaleReplicas { replicas: 0 }),
            RecommendationKind::ScheduleScale => {
                Ok(WorkloadChange::ApplySchedule { off_hours_replicas: 0 })
            }
            RecommendationKind::Resize => {
                let now = chrono::Utc::now().timestamp();
                let window = AnalysisWindow::last_hours(now, 24);
                let samples = self.cluster.get_metrics(&job.workload, &window).await?;
                if samples.is_empty() {
                    return Err(EngineError::ExecutionFailed(
                        "no usage samples to right-size against".to_string(),
                    ));
                }
                let n = samples.len() as f64;
                let mean_cpu = samples.iter().map(|s| s.cpu_millicores).sum::<f64>() / n;
                let mean_mem =
                    samples.iter().map(|s| s.memory_bytes as f64).sum::<f64>() / n;
                Ok(WorkloadChange::Resize {
                    cpu_request_millicores: ((mean_cpu * (1.0 + RESIZE_HEADROOM)) as u32)
                        .max(MIN_CPU_MILLICORES),
                    memory_request_bytes: ((mean_mem * (1.0 + RESIZE_HEADROOM)) as u64)
                        .max(MIN_MEMORY_BYTES),
                })
            }
        }
    }

    /// Poll for rollback signals until the window expires. Expiry without
    /// a signal is the success path; the plan is discarded on completion.
    async fn run_monitoring(self: Arc<Self>, job_id: String) {
        let Ok(job) = self.arena.get(&job_id) else {
            return;
        };
        let kind = job.recommendation.kind;
        let applied_at = chrono::Utc::now().timestamp();
        let deadline = Instant::now() + Duration::from_secs(self.monitoring_secs(kind));
        let mut ticker = interval(Duration::from_secs(
            self.config.monitor_poll_interval_secs.max(1),
        ));

        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    let now = chrono::Utc::now().timestamp();
                    let result = self.arena.transition(&job_id, JobState::Completed, now, |j| {
                        j.rollback_plan = None;
                    });
                    if result.is_ok() {
                        info!(job_id = %job_id, workload = %job.workload, "Monitoring window expired cleanly, optimization complete");
                    }
                    self.metrics.set_jobs_active(self.arena.active_count() as i64);
                    return;
                }
                _ = ticker.tick() => {
                    let until = chrono::Utc::now().timestamp() + 1;
                    let probe_window = AnalysisWindow::new(applied_at, until);
                    match self.monitor.probe(&job.workload, kind, &probe_window).await {
                        Ok(None) => {}
                        Ok(Some(signal)) => {
                            warn!(
                                job_id = %job_id,
                                workload = %job.workload,
                                signal = %signal,
                                "Rollback signal observed"
                            );
                            self.finish_with_rollback(&job, signal.to_string()).await;
                            return;
                        }
                        Err(e) => {
                            // If the change cannot be monitored its safety
                            // cannot be confirmed; revert.
                            warn!(
                                job_id = %job_id,
                                workload = %job.workload,
                                error = %e,
                                "Monitoring unavailable, reverting change"
                            );
                            self.finish_with_rollback(&job, format!("monitoring unavailable: {}", e))
                                .await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Run the rollback plan and move the job terminal: `RolledBack` with
    /// the trigger attached, or `Failed` with the plan preserved when the
    /// rollback itself gives out.
    async fn finish_with_rollback(&self, job: &OptimizationJob, trigger: String) {
        let now = chrono::Utc::now().timestamp();
        let Some(plan) = job.rollback_plan.clone() else {
            let _ = self.arena.transition(&job.id, JobState::Failed, now, |j| {
                j.failure_reason = Some(format!("{}; no rollback plan captured", trigger));
            });
            self.metrics.inc_rollback_failures();
            self.metrics.set_jobs_active(self.arena.active_count() as i64);
            return;
        };

        match self.run_rollback(&plan).await {
            Ok(()) => {
                self.metrics.inc_rollbacks();
                let _ = self
                    .arena
                    .transition(&job.id, JobState::RolledBack, now, |j| {
                        j.failure_reason = Some(trigger.clone());
                    });
                info!(
                    job_id = %job.id,
                    workload = %job.workload,
                    trigger = %trigger,
                    "Rolled back, prior state restored"
                );
            }
            Err(reason) => {
                self.metrics.inc_rollback_failures();
                // The plan stays on the record for manual remediation.
                let _ = self.arena.transition(&job.id, JobState::Failed, now, |j| {
                    j.failure_reason = Some(format!("{}; {}", trigger, reason));
                });
                warn!(
                    job_id = %job.id,
                    workload = %job.workload,
                    reason = %reason,
                    "Rollback failed, manual remediation required"
                );
            }
        }
        self.metrics.set_jobs_active(self.arena.active_count() as i64);
    }

    /// Idempotent restore with bounded retries.
    async fn run_rollback(&self, plan: &RollbackPlan) -> std::result::Result<(), String> {
        let attempts = self.config.rollback_max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.try_restore(plan).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        workload = %plan.workload,
                        attempt = attempt,
                        error = %e,
                        "Rollback attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < attempts {
                        sleep(ROLLBACK_RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(EngineError::RollbackFailed {
            attempts,
            reason: last_error,
        }
        .to_string())
    }

    /// Reapply the captured absolute values and confirm the live state
    /// matches them.
    async fn try_restore(&self, plan: &RollbackPlan) -> Result<()> {
        self.cluster
            .apply_change(
                &plan.workload,
                &WorkloadChange::ScaleReplicas {
                    replicas: plan.prior_replica_count,
                },
            )
            .await?;
        self.cluster
            .apply_change(
                &plan.workload,
                &WorkloadChange::Resize {
                    cpu_request_millicores: plan.prior_cpu_request_millicores,
                    memory_request_bytes: plan.prior_memory_request_bytes,
                },
            )
            .await?;

        let state = self.cluster.get_current_state(&plan.workload).await?;
        if state.replica_count != plan.prior_replica_count
            || state.cpu_request_millicores != plan.prior_cpu_request_millicores
            || state.memory_request_bytes != plan.prior_memory_request_bytes
        {
            return Err(EngineError::ExecutionFailed(
                "restoration not confirmed by live state".to_string(),
            ));
        }
        Ok(())
    }
}
