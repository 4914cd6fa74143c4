//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub serial: SerialConfig,
    pub model: ModelConfig,
    pub monitoring: MonitoringConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Sensor link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Endpoint to connect to at startup, if any
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Upper bound on a single blocking read
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// How long connect/disconnect wait for a previous reader to stop
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,
    /// Delay before the API reports the outcome of a connect
    #[serde(with = "humantime_serde")]
    pub connect_grace: Duration,
}

/// Prediction model configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON file with linear model coefficients
    pub path: Option<PathBuf>,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub prometheus_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5005)),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            read_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(3),
            connect_grace: Duration::from_millis(800),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            prometheus_enabled: true,
        }
    }
}
