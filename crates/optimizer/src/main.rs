//! Idle Optimizer - workload idleness and safe-optimization service
//!
//! Hosts the decision engine: health/readiness probes, Prometheus metrics,
//! and the engine wiring against the deployment's cluster and billing
//! providers.

use anyhow::Result;
use optimizer_lib::{
    health::{components, HealthRegistry},
    observability::{EngineMetrics, StructuredLogger},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = SERVICE_VERSION, "Starting idle-optimizer");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(cluster = %config.cluster_name, "Service configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::SCORER).await;
    health_registry.register(components::COST).await;
    health_registry.register(components::VALIDATOR).await;
    health_registry.register(components::EXECUTOR).await;

    // Initialize metrics and structured logging
    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.cluster_name);
    logger.log_startup(SERVICE_VERSION);

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics.clone()));

    // Mark service as ready after initialization
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    api_handle.abort();

    Ok(())
}
