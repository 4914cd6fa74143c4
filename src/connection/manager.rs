//! Link Manager Implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::error::LinkError;
use super::reader::{self, ReaderContext};
use super::state::{ConnectionState, SharedState};
use crate::config::SerialConfig;
use crate::metrics::Metrics;
use crate::transport::{EndpointInfo, TransportError, TransportFactory};

/// Timing knobs for the link
#[derive(Debug, Clone, Copy)]
pub struct LinkSettings {
    /// Upper bound on one blocking read, and so on cancellation latency
    pub read_timeout: Duration,
    /// How long to wait for a reader to stop before abandoning it
    pub stop_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::from(&SerialConfig::default())
    }
}

impl From<&SerialConfig> for LinkSettings {
    fn from(config: &SerialConfig) -> Self {
        Self {
            read_timeout: config.read_timeout,
            stop_timeout: config.stop_timeout,
        }
    }
}

/// The running reader of the current session
struct ReaderHandle {
    session_id: String,
    endpoint: String,
    cancel: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

/// Owns at most one sensor connection and its reader task
pub struct LinkManager {
    factory: Arc<dyn TransportFactory>,
    transport_available: bool,
    settings: LinkSettings,
    state: Arc<SharedState>,
    metrics: Arc<Metrics>,
    /// Serializes connect/disconnect; holds the current reader, if any
    reader: Mutex<Option<ReaderHandle>>,
}

impl LinkManager {
    /// Create a new LinkManager
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        settings: LinkSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        let transport_available = factory.is_available();
        if !transport_available {
            warn!("Transport subsystem unavailable, connect requests will be rejected");
        }

        Self {
            factory,
            transport_available,
            settings,
            state: Arc::new(SharedState::new()),
            metrics,
            reader: Mutex::new(None),
        }
    }

    /// Whether transports can be opened at all in this deployment
    pub fn transport_available(&self) -> bool {
        self.transport_available
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Consistent copy of the link state
    pub fn snapshot(&self) -> ConnectionState {
        self.state.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.state.snapshot().connected
    }

    /// Whether a reader task is still running for the current session
    pub async fn reader_active(&self) -> bool {
        self.reader
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.join.is_finished())
            .unwrap_or(false)
    }

    /// Open `endpoint` and start reading from it, replacing any current link
    #[instrument(skip(self))]
    pub async fn connect(&self, endpoint: &str, baud_rate: u32) -> Result<(), LinkError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(LinkError::Configuration("no endpoint specified".to_string()));
        }
        if baud_rate == 0 {
            return Err(LinkError::Configuration("baud rate must be greater than 0".to_string()));
        }
        if !self.transport_available {
            return Err(LinkError::Configuration(
                "transport subsystem is not available in this deployment".to_string(),
            ));
        }

        self.metrics.record_connect_attempt();
        let mut slot = self.reader.lock().await;

        self.stop_reader(slot.take()).await;

        let factory = Arc::clone(&self.factory);
        let target = endpoint.to_string();
        let opened = tokio::task::spawn_blocking(move || factory.open(&target, baud_rate))
            .await
            .unwrap_or_else(|e| {
                Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("open task failed: {}", e),
                )))
            });

        let transport = match opened {
            Ok(transport) => transport,
            Err(e) => {
                let message = match e {
                    TransportError::Open { message, .. } => message,
                    other => other.to_string(),
                };
                self.state.update(|s| {
                    s.connected = false;
                    s.endpoint_id = None;
                    s.session_id = None;
                    s.last_error = Some(format!("failed to open {}: {}", endpoint, message));
                });
                self.metrics.record_connect_failure();
                self.metrics.set_connected(false);
                warn!(error = %message, "Failed to open transport");
                return Err(LinkError::TransportOpen {
                    endpoint: endpoint.to_string(),
                    message,
                });
            }
        };

        let session_id = Uuid::new_v4().to_string();
        let generation = self.state.begin_session(endpoint, &session_id);
        let cancel = Arc::new(AtomicBool::new(false));

        let ctx = ReaderContext {
            transport,
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
            cancel: Arc::clone(&cancel),
            generation,
            read_timeout: self.settings.read_timeout,
            session_id: session_id.clone(),
        };
        let join = tokio::task::spawn_blocking(move || reader::run(ctx));

        *slot = Some(ReaderHandle {
            session_id: session_id.clone(),
            endpoint: endpoint.to_string(),
            cancel,
            join,
        });
        self.metrics.set_connected(true);

        info!(session_id = %session_id, "Sensor link connected");
        Ok(())
    }

    /// Stop reading and release the transport. Safe to call at any time.
    pub async fn disconnect(&self) {
        let mut slot = self.reader.lock().await;
        let handle = slot.take();
        let was_active = handle.is_some();

        self.stop_reader(handle).await;

        self.state.update(|s| {
            s.connected = false;
            s.endpoint_id = None;
            s.session_id = None;
            s.last_reading = None;
            s.last_update = None;
        });
        self.metrics.set_connected(false);

        if was_active {
            info!("Sensor link disconnected");
        } else {
            debug!("Disconnect requested with no active link");
        }
    }

    /// Enumerate endpoints the transport layer can see
    pub async fn available_endpoints(&self) -> Result<Vec<EndpointInfo>, LinkError> {
        if !self.transport_available {
            return Err(LinkError::Configuration(
                "transport subsystem is not available in this deployment".to_string(),
            ));
        }

        let factory = Arc::clone(&self.factory);
        let endpoints = tokio::task::spawn_blocking(move || factory.available_endpoints())
            .await
            .unwrap_or_else(|e| {
                Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("enumeration task failed: {}", e),
                )))
            })?;

        Ok(endpoints)
    }

    /// Release the link on process exit
    pub async fn shutdown(&self) {
        info!("Shutting down sensor link");
        self.disconnect().await;
    }

    /// Cancel a reader and wait, bounded, for it to release its transport.
    ///
    /// The session is retired first, so a reader that outlives the wait can
    /// no longer touch the shared state.
    async fn stop_reader(&self, handle: Option<ReaderHandle>) {
        self.state.retire_session();

        let Some(handle) = handle else {
            return;
        };

        handle.cancel.store(true, Ordering::SeqCst);
        debug!(session_id = %handle.session_id, endpoint = %handle.endpoint, "Stopping reader");

        match timeout(self.settings.stop_timeout, handle.join).await {
            Ok(Ok(())) => {
                debug!(session_id = %handle.session_id, "Reader stopped");
            }
            Ok(Err(e)) => {
                error!(session_id = %handle.session_id, "Reader task failed: {}", e);
            }
            Err(_) => {
                warn!(
                    session_id = %handle.session_id,
                    endpoint = %handle.endpoint,
                    "Reader did not stop within {:?}, abandoning it",
                    self.settings.stop_timeout
                );
            }
        }
    }
}
