//! Engine library for workload idle optimization
//!
//! This crate provides the core functionality for:
//! - Windowed metrics & activity retention with request classification
//! - Idle probability scoring with confidence grading
//! - Cost attribution against real or estimated node pricing
//! - Risk-graded recommendation planning
//! - Safety validation and monitored execution with automatic rollback

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod cost;
pub mod error;
pub mod execution;
pub mod health;
pub mod models;
pub mod observability;
pub mod planner;
pub mod providers;
pub mod safety;
pub mod scoring;
pub mod store;

pub use analysis::{AnalysisService, OptimizationEngine, WorkloadAnalysis};
pub use error::{EngineError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
