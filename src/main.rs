//! Sensorlink - live serial sensor ingestion service
//!
//! Streams JSON readings from a serial device, keeps the latest one in
//! memory, and serves connect/disconnect/status/predict over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{error, info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use sensorlink::{
    config::ConfigManager,
    management::{AppState, ManagementServer},
    metrics::Metrics,
    model::{LinearModel, RiskModel},
    transport, LinkManager, LinkSettings, ShutdownCoordinator,
};

/// CLI arguments for Sensorlink
#[derive(Parser, Debug)]
#[command(name = "sensorlink")]
#[command(about = "Sensorlink - live serial sensor ingestion service")]
#[command(version)]
#[command(long_about = "
Sensorlink - live serial sensor ingestion service

Reads newline-delimited JSON records ({\"temperature\":..,\"gas\":..,\"moisture\":..})
from a serial device and exposes the latest reading and a risk prediction
over a REST API.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  SENSORLINK_SERIAL_PORT   - Port to connect to at startup (e.g., /dev/ttyUSB0, COM3)
  SENSORLINK_BAUD_RATE     - Baud rate for the startup connection
  SENSORLINK_READ_TIMEOUT  - Per-read timeout (e.g., 2s)
  SENSORLINK_STOP_TIMEOUT  - Reader stop timeout (e.g., 3s)
  SENSORLINK_BIND_ADDR     - HTTP bind address (e.g., 127.0.0.1:5005)
  SENSORLINK_MODEL_PATH    - Linear model coefficients (JSON)
  SENSORLINK_LOG_LEVEL     - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "sensorlink.toml", help = "Path to configuration file")]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "HTTP bind address (e.g., 127.0.0.1:5005)")]
    pub bind: Option<String>,

    /// Serial port to connect to at startup
    #[arg(short = 'p', long, help = "Serial port to connect to at startup")]
    pub serial_port: Option<String>,

    /// Baud rate for the startup connection
    #[arg(long, help = "Baud rate for the startup connection")]
    pub baud_rate: Option<u32>,

    /// Model coefficients file
    #[arg(short, long, help = "Path to linear model coefficients (JSON)")]
    pub model: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level (overrides config file)")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// List available serial ports and exit
    #[arg(long, help = "List available serial ports and exit")]
    pub list_ports: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let log_filter = init_tracing(&args)?;

    info!("Starting Sensorlink v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ConfigManager::load(&args.config)?;

    apply_configured_log_level(&args, &log_filter, &config.monitoring.log_level)?;

    config.merge_with_cli_args(
        args.bind.as_deref(),
        args.serial_port.as_deref(),
        args.baud_rate,
        args.model.as_deref(),
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  Bind address: {}", config.server.bind_addr);
        info!(
            "  Startup port: {}",
            config.serial.port.as_deref().unwrap_or("(none)")
        );
        info!("  Baud rate: {}", config.serial.baud_rate);
        info!("  Read timeout: {:?}", config.serial.read_timeout);
        info!("  Stop timeout: {:?}", config.serial.stop_timeout);
        info!(
            "  Model: {}",
            config
                .model
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
        return Ok(());
    }

    let metrics = Arc::new(Metrics::new());
    let link = Arc::new(LinkManager::new(
        transport::default_factory(),
        LinkSettings::from(&config.serial),
        Arc::clone(&metrics),
    ));

    if args.list_ports {
        let endpoints = link
            .available_endpoints()
            .await
            .context("Failed to enumerate serial ports")?;
        if endpoints.is_empty() {
            info!("No serial ports found");
        }
        for endpoint in endpoints {
            info!(
                "  {} ({:?}) {} {}",
                endpoint.name,
                endpoint.kind,
                endpoint.manufacturer.as_deref().unwrap_or(""),
                endpoint.product.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    let model: Option<Arc<dyn RiskModel>> = match &config.model.path {
        Some(path) => Some(Arc::new(
            LinearModel::load_from_file(path).context("Failed to load prediction model")?,
        )),
        None => {
            warn!("No prediction model configured, /predict will be unavailable");
            None
        }
    };

    // Auto-connect without holding up startup
    if let Some(port) = config.serial.port.clone() {
        let link = Arc::clone(&link);
        let baud_rate = config.serial.baud_rate;
        info!("Auto-connecting to {} at {} baud", port, baud_rate);
        tokio::spawn(async move {
            if let Err(e) = link.connect(&port, baud_rate).await {
                warn!("Auto-connect to {} failed: {}", port, e);
            }
        });
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let app_state = AppState {
        link: Arc::clone(&link),
        model,
        metrics: Arc::clone(&metrics),
        default_baud_rate: config.serial.baud_rate,
        connect_grace: config.serial.connect_grace,
        start_time: SystemTime::now(),
    };
    let server = ManagementServer::new(
        config.server.bind_addr,
        app_state,
        config.monitoring.prometheus_enabled,
    );

    let mut server_shutdown = shutdown_coordinator.subscribe();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = server_shutdown.recv().await;
        };
        if let Err(e) = server.start(shutdown).await {
            error!("Management API server error: {:#}", e);
        }
    });

    info!("Sensorlink started, API on http://{}", config.server.bind_addr);
    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    if let Err(e) = shutdown_coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
        shutdown_coordinator.trigger();
    }

    info!("Initiating graceful shutdown...");
    shutdown_coordinator.shutdown_link(&link).await;

    if let Err(e) = server_handle.await {
        if !e.is_cancelled() {
            error!("Server task failed: {}", e);
        }
    }

    info!("Shutdown complete");

    Ok(())
}

/// Log level chosen on the command line, if any
fn cli_log_level(args: &CliArgs) -> Option<&str> {
    if args.verbose {
        Some("debug")
    } else {
        args.log_level.as_deref()
    }
}

/// Initialize tracing/logging
///
/// `RUST_LOG` wins, then `--verbose`/`--log-level`, else `info` until the
/// configuration is loaded.
fn init_tracing(args: &CliArgs) -> Result<reload::Handle<EnvFilter, Registry>> {
    let log_level = cli_log_level(args).unwrap_or("info");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .init();

    Ok(handle)
}

/// Switch to the configured log level unless the command line or
/// `RUST_LOG` already chose one
fn apply_configured_log_level(
    args: &CliArgs,
    handle: &reload::Handle<EnvFilter, Registry>,
    configured_level: &str,
) -> Result<()> {
    if cli_log_level(args).is_some() || std::env::var("RUST_LOG").is_ok() {
        return Ok(());
    }

    handle
        .reload(EnvFilter::new(configured_level))
        .context("Failed to apply configured log level")?;
    info!("Log level set to {} from configuration", configured_level);
    Ok(())
}
