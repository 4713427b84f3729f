//! Optimization job arena
//!
//! Job records keyed by id, plus the per-workload exclusivity claim: at
//! most one non-terminal job may exist per workload, enforced by an atomic
//! entry-based claim that fails fast instead of queuing.

use crate::error::{EngineError, Result};
use crate::models::{JobState, OptimizationJob, Recommendation, WorkloadRef};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Arena of job records with atomic per-workload claim/release.
pub struct JobArena {
    jobs: DashMap<String, OptimizationJob>,
    active: DashMap<WorkloadRef, String>,
    next_id: AtomicU64,
}

impl JobArena {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            active: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Claim the workload's exclusivity token and create a `Pending` job.
    /// Fails fast with `JobAlreadyActive` while a non-terminal job holds
    /// the claim.
    pub fn claim(
        &self,
        workload: &WorkloadRef,
        recommendation: Recommendation,
        now: i64,
    ) -> Result<OptimizationJob> {
        match self.active.entry(workload.clone()) {
            Entry::Occupied(entry) => {
                Err(EngineError::JobAlreadyActive(format!(
                    "{} (job {})",
                    workload,
                    entry.get()
                )))
            }
            Entry::Vacant(entry) => {
                let id = format!("opt-{:06}", self.next_id.fetch_add(1, Ordering::SeqCst));
                let job = OptimizationJob {
                    id: id.clone(),
                    workload: workload.clone(),
                    recommendation,
                    state: JobState::Pending,
                    rollback_plan: None,
                    failure_reason: None,
                    created_at: now,
                    updated_at: now,
                };
                entry.insert(id.clone());
                self.jobs.insert(id.clone(), job.clone());
                debug!(job_id = %id, workload = %workload, "Claimed optimization job");
                Ok(job)
            }
        }
    }

    pub fn get(&self, job_id: &str) -> Result<OptimizationJob> {
        self.jobs
            .get(job_id)
            .map(|j| j.clone())
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))
    }

    /// The non-terminal job holding a workload's claim, if any.
    pub fn active_job(&self, workload: &WorkloadRef) -> Option<OptimizationJob> {
        let id = self.active.get(workload)?.clone();
        self.jobs.get(&id).map(|j| j.clone())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Move a job to a new state, applying `mutate` to the record under
    /// the same lock. Terminal states release the workload claim.
    pub fn transition<F>(
        &self,
        job_id: &str,
        to: JobState,
        now: i64,
        mutate: F,
    ) -> Result<OptimizationJob>
    where
        F: FnOnce(&mut OptimizationJob),
    {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;

        if !valid_transition(entry.state, to) {
            return Err(EngineError::InvalidTransition {
                job_id: job_id.to_string(),
                from: entry.state.to_string(),
                to: to.to_string(),
            });
        }

        let from = entry.state;
        entry.state = to;
        entry.updated_at = now;
        mutate(&mut entry);
        let job = entry.clone();
        drop(entry);

        if to.is_terminal() {
            self.active
                .remove_if(&job.workload, |_, active_id| active_id == job_id);
        }

        debug!(job_id = %job_id, from = %from, to = %to, "Job transition");
        Ok(job)
    }

    /// Cancel a job that has not yet touched the live workload. The record
    /// is discarded and the claim released. Once executing, cancellation is
    /// denied and the monitoring logic decides the outcome.
    pub fn cancel(&self, job_id: &str) -> Result<OptimizationJob> {
        let state = self.get(job_id)?.state;
        match state {
            JobState::Pending | JobState::Validated => {
                let Some((_, job)) = self.jobs.remove(job_id) else {
                    return Err(EngineError::JobNotFound(job_id.to_string()));
                };
                self.active
                    .remove_if(&job.workload, |_, active_id| active_id == job_id);
                debug!(job_id = %job_id, "Cancelled job before execution");
                Ok(job)
            }
            s if s.is_terminal() => Err(EngineError::InvalidTransition {
                job_id: job_id.to_string(),
                from: s.to_string(),
                to: "cancelled".to_string(),
            }),
            _ => Err(EngineError::CancellationDenied(job_id.to_string())),
        }
    }
}

impl Default for JobArena {
    fn default() -> Self {
        Self::new()
    }
}

/// The state machine's allowed edges.
fn valid_transition(from: JobState, to: JobState) -> bool {
    use JobState::*;
    match (from, to) {
        (Pending, Validated) => true,
        (Validated, Executing) => true,
        (Executing, Monitoring) => true,
        (Monitoring, Completed) => true,
        (Monitoring, RolledBack) => true,
        // Execution failure rolls back without entering monitoring.
        (Executing, RolledBack) => true,
        // Any non-terminal state may fail.
        (from, Failed) => !from.is_terminal(),
        _ => false,
    }
}
