//! Service configuration

use anyhow::Result;
use serde::Deserialize;

/// Hosting service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Cluster name this instance analyzes
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_cluster_name() -> String {
    std::env::var("CLUSTER_NAME").unwrap_or_else(|_| "default".to_string())
}

fn default_api_port() -> u16 {
    8080
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("OPTIMIZER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServiceConfig {
            cluster_name: default_cluster_name(),
            api_port: default_api_port(),
        }))
    }
}
