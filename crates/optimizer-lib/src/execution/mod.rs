//! Optimization execution and rollback
//!
//! The job state machine (`Pending -> Validated -> Executing -> Monitoring
//! -> {Completed | RolledBack | Failed}`), the per-workload exclusivity
//! arena, and the monitored apply/rollback controller.

mod controller;
mod jobs;
mod monitor;

#[cfg(test)]
mod tests;

pub use controller::ExecutionController;
pub use jobs::JobArena;
pub use monitor::{
    ActivityRollbackMonitor, RollbackMonitor, RollbackSignal, ServiceStats, ServiceStatsSource,
};
