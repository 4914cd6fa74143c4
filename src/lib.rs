//! Sensorlink Library
//! 
//! Live ingestion of JSON sensor readings (temperature, gas index, moisture)
//! from a serial device, with a thread-safe snapshot of the latest reading,
//! runtime connect/disconnect, and risk scoring over a small REST API.

pub mod config;
pub mod connection;
pub mod management;
pub mod metrics;
pub mod model;
pub mod reading;
pub mod risk;
pub mod shutdown;
pub mod transport;

pub use config::Config;
pub use connection::{ConnectionState, LinkError, LinkManager, LinkSettings};
pub use shutdown::ShutdownCoordinator;

/// Common error type for the service
pub type Result<T> = anyhow::Result<T>;
