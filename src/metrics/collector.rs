//! Metrics Collector

use prometheus::{Counter, Gauge, Registry, TextEncoder};
use tracing::error;

/// Collects and exports link metrics
pub struct Metrics {
    prometheus_registry: Registry,

    lines_received_total: Counter,
    readings_published_total: Counter,
    lines_discarded_total: Counter,
    connect_attempts_total: Counter,
    connect_failures_total: Counter,
    read_errors_total: Counter,
    predictions_total: Counter,
    link_connected: Gauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let prometheus_registry = Registry::new();

        let lines_received_total = Counter::new(
            "sensorlink_lines_received_total",
            "Total non-blank lines read from the sensor transport"
        ).expect("Failed to create lines_received_total counter");

        let readings_published_total = Counter::new(
            "sensorlink_readings_published_total",
            "Total sensor records published to the shared snapshot"
        ).expect("Failed to create readings_published_total counter");

        let lines_discarded_total = Counter::new(
            "sensorlink_lines_discarded_total",
            "Total non-blank lines discarded as malformed"
        ).expect("Failed to create lines_discarded_total counter");

        let connect_attempts_total = Counter::new(
            "sensorlink_connect_attempts_total",
            "Total connect attempts"
        ).expect("Failed to create connect_attempts_total counter");

        let connect_failures_total = Counter::new(
            "sensorlink_connect_failures_total",
            "Total connect attempts that failed"
        ).expect("Failed to create connect_failures_total counter");

        let read_errors_total = Counter::new(
            "sensorlink_read_errors_total",
            "Total sessions ended by a transport read error"
        ).expect("Failed to create read_errors_total counter");

        let predictions_total = Counter::new(
            "sensorlink_predictions_total",
            "Total risk predictions served"
        ).expect("Failed to create predictions_total counter");

        let link_connected = Gauge::new(
            "sensorlink_link_connected",
            "1 while a reader is attached to an open transport"
        ).expect("Failed to create link_connected gauge");

        for collector in [
            &lines_received_total,
            &readings_published_total,
            &lines_discarded_total,
            &connect_attempts_total,
            &connect_failures_total,
            &read_errors_total,
            &predictions_total,
        ] {
            prometheus_registry.register(Box::new(collector.clone()))
                .expect("Failed to register counter");
        }
        prometheus_registry.register(Box::new(link_connected.clone()))
            .expect("Failed to register link_connected");

        Self {
            prometheus_registry,
            lines_received_total,
            readings_published_total,
            lines_discarded_total,
            connect_attempts_total,
            connect_failures_total,
            read_errors_total,
            predictions_total,
            link_connected,
        }
    }

    pub fn record_line_received(&self) {
        self.lines_received_total.inc();
    }

    pub fn record_reading_published(&self) {
        self.readings_published_total.inc();
    }

    pub fn record_line_discarded(&self) {
        self.lines_discarded_total.inc();
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts_total.inc();
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures_total.inc();
    }

    pub fn record_read_error(&self) {
        self.read_errors_total.inc();
    }

    pub fn record_prediction(&self) {
        self.predictions_total.inc();
    }

    pub fn set_connected(&self, connected: bool) {
        self.link_connected.set(if connected { 1.0 } else { 0.0 });
    }

    pub fn get_lines_received(&self) -> u64 {
        self.lines_received_total.get() as u64
    }

    pub fn get_read_errors(&self) -> u64 {
        self.read_errors_total.get() as u64
    }

    pub fn get_readings_published(&self) -> u64 {
        self.readings_published_total.get() as u64
    }

    pub fn get_lines_discarded(&self) -> u64 {
        self.lines_discarded_total.get() as u64
    }

    pub fn get_connect_failures(&self) -> u64 {
        self.connect_failures_total.get() as u64
    }

    pub fn is_connected(&self) -> bool {
        self.link_connected.get() > 0.0
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}
