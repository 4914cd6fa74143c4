//! Link error types

use crate::transport::TransportError;
use thiserror::Error;

/// Errors surfaced to callers of the link manager.
///
/// Read failures during a session and malformed lines are never returned
/// here; the former are recorded in the snapshot's `last_error`, the latter
/// are dropped.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Missing endpoint, bad baud rate, or no transport subsystem
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The endpoint could not be opened
    #[error("failed to open {endpoint}: {message}")]
    TransportOpen { endpoint: String, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl LinkError {
    /// Whether the caller supplied something unusable
    pub fn is_configuration(&self) -> bool {
        matches!(self, LinkError::Configuration(_))
    }
}
