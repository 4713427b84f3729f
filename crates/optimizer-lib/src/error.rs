//! Error types for the idle optimizer engine
//!
//! Insufficient data is deliberately NOT an error: analyses over sparse
//! windows return a flagged result with capped confidence instead.

use crate::models::SafetyCheckResult;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur during analysis, validation, or execution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The cluster data provider could not be reached. Scoring and
    /// validation fail closed on this.
    #[error("cluster provider unavailable: {0}")]
    ClusterUnavailable(String),

    /// The billing provider could not be reached. Cost attribution falls
    /// back to estimation instead of surfacing this.
    #[error("billing provider unavailable: {0}")]
    BillingUnavailable(String),

    /// One or more safety checks failed; the job was never created.
    #[error("validation failed for {workload}: {}", failure_summary(.failures))]
    ValidationFailed {
        workload: String,
        failures: Vec<SafetyCheckResult>,
    },

    /// A non-terminal job already holds the workload's exclusivity claim.
    #[error("optimization job already active for {0}")]
    JobAlreadyActive(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    /// A transition was requested that the state machine does not permit.
    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },

    /// Applying the change failed; an immediate rollback was attempted.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Rollback itself failed after bounded retries. The only outcome that
    /// requires manual attention.
    #[error("rollback failed after {attempts} attempts: {reason}")]
    RollbackFailed { attempts: u32, reason: String },

    /// Cancellation was requested after execution had begun.
    #[error("cancellation denied for job {0}: change already applied")]
    CancellationDenied(String),
}

fn failure_summary(failures: &[SafetyCheckResult]) -> String {
    let names: Vec<&str> = failures
        .iter()
        .filter(|f| !f.passed)
        .map(|f| f.check_name.as_str())
        .collect();
    names.join(", ")
}
