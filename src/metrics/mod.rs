//! Metrics Module
//! 
//! Prometheus counters for the sensor link and the prediction endpoint.

pub mod collector;

pub use collector::Metrics;
