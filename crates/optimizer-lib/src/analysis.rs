//! Workload analysis orchestration and the engine facade
//!
//! `AnalysisService` pulls windowed data from the cluster provider through
//! the activity store, scores idleness, attributes cost, and plans
//! recommendations. Independent workloads fan out across a bounded worker
//! pool. `OptimizationEngine` wires the full stack and exposes the
//! operations consumed by CLI and reporting layers.

use crate::classifier::RequestClassifier;
use crate::config::EngineConfig;
use crate::cost::CostAttributor;
use crate::error::Result;
use crate::execution::{ActivityRollbackMonitor, ExecutionController, RollbackMonitor};
use crate::models::{
    AnalysisWindow, CostBreakdown, IdleAnalysisResult, OptimizationJob, Recommendation,
    WorkloadRef,
};
use crate::observability::EngineMetrics;
use crate::planner::RecommendationPlanner;
use crate::providers::{BillingProvider, ClusterProvider};
use crate::safety::SafetyValidator;
use crate::scoring::{BaselineStore, IdleScorer, ScoringInput, WeightedIdleScorer};
use crate::store::ActivityStore;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info};

/// Full result of analyzing one workload.
#[derive(Debug, Clone)]
pub struct WorkloadAnalysis {
    pub idle: IdleAnalysisResult,
    pub cost: CostBreakdown,
    pub recommendations: Vec<Recommendation>,
}

/// Score/cost/plan pipeline with bounded per-workload fan-out.
pub struct AnalysisService {
    cluster: Arc<dyn ClusterProvider>,
    store: Arc<ActivityStore>,
    baselines: Arc<BaselineStore>,
    scorer: Arc<dyn IdleScorer>,
    cost: Arc<CostAttributor>,
    planner: Arc<RecommendationPlanner>,
    semaphore: Arc<Semaphore>,
    metrics: EngineMetrics,
}

impl AnalysisService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cluster: Arc<dyn ClusterProvider>,
        store: Arc<ActivityStore>,
        baselines: Arc<BaselineStore>,
        scorer: Arc<dyn IdleScorer>,
        cost: Arc<CostAttributor>,
        planner: Arc<RecommendationPlanner>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            cluster,
            store,
            baselines,
            scorer,
            cost,
            planner,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            metrics: EngineMetrics::new(),
        }
    }

    /// Analyze one workload over a window. Cluster unavailability fails
    /// closed; billing unavailability degrades to estimated pricing inside
    /// the cost engine.
    pub async fn analyze(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Result<WorkloadAnalysis> {
        let started = Instant::now();

        let samples = self.cluster.get_metrics(workload, window).await?;
        let requests = self.cluster.get_request_log(workload, window).await?;
        let dependencies = self.cluster.get_dependencies(workload).await?;
        let state = self.cluster.get_current_state(workload).await?;

        for sample in samples {
            self.store.record_sample(workload, sample);
        }
        for request in requests {
            self.store.record_request(workload, request);
        }
        self.metrics
            .set_workloads_tracked(self.store.tracked_workloads() as i64);

        let samples = self.store.metrics_in(workload, window);
        let counts = self.store.request_counts(workload, window);
        let profile = self.baselines.profile(workload);

        let input = ScoringInput {
            workload: workload.clone(),
            window: *window,
            samples: &samples,
            counts,
            dependencies: &dependencies,
            baseline: self.baselines.baseline(workload),
            profile: profile.as_ref(),
        };
        let idle = self.scorer.score(&input);

        let cost = self.cost.attribute(workload, window, &state, &samples).await;
        let recommendations = self.planner.plan(&idle, &cost, window);

        self.metrics.inc_analyses();
        if idle.insufficient_data {
            self.metrics.inc_insufficient_data();
        }
        for recommendation in &recommendations {
            self.metrics
                .inc_recommendation(&recommendation.kind.to_string());
        }
        self.metrics
            .observe_analysis_latency(started.elapsed().as_secs_f64());

        debug!(
            workload = %workload,
            idle_probability = idle.idle_probability,
            confidence = idle.confidence,
            wasted_cost = cost.wasted_cost,
            recommendations = recommendations.len(),
            "Workload analyzed"
        );

        Ok(WorkloadAnalysis {
            idle,
            cost,
            recommendations,
        })
    }

    /// Analyze many workloads concurrently, bounded by the worker pool.
    /// Per-workload failures are reported alongside successes rather than
    /// aborting the batch.
    pub async fn analyze_many(
        self: &Arc<Self>,
        workloads: Vec<WorkloadRef>,
        window: AnalysisWindow,
    ) -> Vec<(WorkloadRef, Result<WorkloadAnalysis>)> {
        let mut handles = Vec::with_capacity(workloads.len());
        for workload in workloads {
            let service = Arc::clone(self);
            let semaphore = self.semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = service.analyze(&workload, &window).await;
                (workload, result)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(entry) = handle.await {
                results.push(entry);
            }
        }
        results
    }

    pub fn store(&self) -> &Arc<ActivityStore> {
        &self.store
    }

    pub fn baselines(&self) -> &Arc<BaselineStore> {
        &self.baselines
    }
}

/// The engine facade: analysis, submission, and job inspection, wired from
/// configuration and the two external collaborators.
pub struct OptimizationEngine {
    analysis: Arc<AnalysisService>,
    controller: Arc<ExecutionController>,
}

impl OptimizationEngine {
    /// Wire the full engine with the default scorer, check chain, and
    /// monitor.
    pub fn new(
        config: EngineConfig,
        cluster: Arc<dyn ClusterProvider>,
        billing: Arc<dyn BillingProvider>,
    ) -> Self {
        let classifier = Arc::new(RequestClassifier::new(config.classifier.clone()));
        let store = Arc::new(ActivityStore::new(config.store.clone(), classifier.clone()));
        let baselines = Arc::new(BaselineStore::new());
        let scorer: Arc<dyn IdleScorer> =
            Arc::new(WeightedIdleScorer::new(config.scoring.clone()));
        let cost = Arc::new(CostAttributor::new(config.cost.clone(), billing));
        let planner = Arc::new(RecommendationPlanner::new(config.planner.clone()));

        let analysis = Arc::new(AnalysisService::new(
            cluster.clone(),
            store,
            baselines,
            scorer,
            cost,
            planner,
            config.analysis.max_concurrent_analyses,
        ));

        let validator = Arc::new(SafetyValidator::with_default_checks(&config.safety));
        let monitor: Arc<dyn RollbackMonitor> = Arc::new(ActivityRollbackMonitor::new(
            cluster.clone(),
            classifier,
            config.execution.error_rate_threshold,
            config.execution.latency_threshold_ms,
        ));
        let controller = Arc::new(ExecutionController::new(
            cluster,
            validator,
            monitor,
            config.execution.clone(),
        ));

        info!("Optimization engine wired");
        Self {
            analysis,
            controller,
        }
    }

    /// Assemble one from already-constructed parts, for callers that swap
    /// in their own scorer or checks.
    pub fn from_parts(analysis: Arc<AnalysisService>, controller: Arc<ExecutionController>) -> Self {
        Self {
            analysis,
            controller,
        }
    }

    /// Score, attribute, and plan for one workload.
    pub async fn analyze_workload(
        &self,
        workload: &WorkloadRef,
        window: &AnalysisWindow,
    ) -> Result<WorkloadAnalysis> {
        self.analysis.analyze(workload, window).await
    }

    /// Validate and start executing a recommendation. Returns the job id,
    /// or the validation error that blocked it.
    pub async fn submit_optimization(
        &self,
        workload: &WorkloadRef,
        recommendation: &Recommendation,
    ) -> Result<String> {
        let job = self.controller.submit(workload, recommendation).await?;
        let job = self.controller.execute(&job.id).await?;
        Ok(job.id)
    }

    pub fn get_job_status(&self, job_id: &str) -> Result<OptimizationJob> {
        self.controller.job_status(job_id)
    }

    /// Cancel a job that has not started executing.
    pub fn cancel_job(&self, job_id: &str) -> Result<OptimizationJob> {
        self.controller.cancel(job_id)
    }

    pub fn analysis(&self) -> &Arc<AnalysisService> {
        &self.analysis
    }

    pub fn controller(&self) -> &Arc<ExecutionController> {
        &self.controller
    }
}
