//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest baud rate accepted by validation
const MAX_BAUD_RATE: u32 = 4_000_000;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// File (or defaults), then environment overrides
    pub fn load(path: &Path) -> Result<Config> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()
            .with_context(|| "Configuration invalid after environment overrides")?;
        Ok(config)
    }
}

impl Config {
    /// Apply `SENSORLINK_*` overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SENSORLINK_SERIAL_PORT") {
            let port = port.trim().to_string();
            self.serial.port = if port.is_empty() { None } else { Some(port) };
        }

        if let Some(baud) = lookup("SENSORLINK_BAUD_RATE") {
            self.serial.baud_rate = baud.trim().parse::<u32>()
                .with_context(|| format!("Invalid SENSORLINK_BAUD_RATE: {}", baud))?;
        }

        if let Some(timeout) = lookup("SENSORLINK_READ_TIMEOUT") {
            self.serial.read_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid SENSORLINK_READ_TIMEOUT: {}", timeout))?;
        }

        if let Some(timeout) = lookup("SENSORLINK_STOP_TIMEOUT") {
            self.serial.stop_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid SENSORLINK_STOP_TIMEOUT: {}", timeout))?;
        }

        if let Some(bind_addr) = lookup("SENSORLINK_BIND_ADDR") {
            self.server.bind_addr = bind_addr.parse::<SocketAddr>()
                .with_context(|| format!("Invalid SENSORLINK_BIND_ADDR: {}", bind_addr))?;
        }

        if let Some(path) = lookup("SENSORLINK_MODEL_PATH") {
            self.model.path = Some(PathBuf::from(path));
        }

        if let Some(log_level) = lookup("SENSORLINK_LOG_LEVEL") {
            self.monitoring.log_level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_serial_config()
            .with_context(|| "Serial configuration validation failed")?;

        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_serial_config(&self) -> Result<()> {
        if let Some(port) = &self.serial.port {
            if port.trim().is_empty() {
                bail!("serial.port must not be empty when set");
            }
        }

        if self.serial.baud_rate == 0 {
            bail!("baud_rate must be greater than 0");
        }

        if self.serial.baud_rate > MAX_BAUD_RATE {
            bail!("baud_rate cannot exceed {}", MAX_BAUD_RATE);
        }

        if self.serial.read_timeout.is_zero() {
            bail!("read_timeout must be greater than 0");
        }

        if self.serial.read_timeout > Duration::from_secs(60) {
            bail!("read_timeout cannot exceed 60 seconds");
        }

        if self.serial.stop_timeout.is_zero() {
            bail!("stop_timeout must be greater than 0");
        }

        if self.serial.connect_grace > Duration::from_secs(10) {
            bail!("connect_grace cannot exceed 10 seconds");
        }

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.shutdown_timeout.is_zero() {
            bail!("shutdown_timeout must be greater than 0");
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!("monitoring.log_level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        bind: Option<&str>,
        serial_port: Option<&str>,
        baud_rate: Option<u32>,
        model_path: Option<&Path>,
    ) {
        if let Some(bind_str) = bind {
            if let Ok(addr) = bind_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                tracing::info!("CLI override: bind address set to {}", addr);
            } else {
                tracing::warn!("Invalid bind address provided: {}", bind_str);
            }
        }

        if let Some(port) = serial_port {
            self.serial.port = Some(port.to_string());
            tracing::info!("CLI override: serial port set to {}", port);
        }

        if let Some(baud) = baud_rate {
            self.serial.baud_rate = baud;
            tracing::info!("CLI override: baud rate set to {}", baud);
        }

        if let Some(path) = model_path {
            self.model.path = Some(path.to_path_buf());
            tracing::info!("CLI override: model path set to {}", path.display());
        }
    }
}
