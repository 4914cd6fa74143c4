//! Transport Types

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised at the transport seam
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport subsystem is not available in this build")]
    Unavailable,

    #[error("failed to open {endpoint}: {message}")]
    Open { endpoint: String, message: String },

    #[error("transport closed by peer")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Outcome of a single bounded read
#[derive(Debug, Clone, PartialEq)]
pub enum LineRead {
    /// One complete line, without its terminator
    Line(String),
    /// Nothing arrived within the timeout
    Timeout,
}

/// Kind of an enumerated endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Usb,
    Bluetooth,
    Pci,
    Virtual,
    Unknown,
}

/// An endpoint the transport layer can open
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointInfo {
    pub name: String,
    pub kind: EndpointKind,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl EndpointInfo {
    /// Endpoint with no hardware details
    pub fn named(name: impl Into<String>, kind: EndpointKind) -> Self {
        Self {
            name: name.into(),
            kind,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

/// An open, line-oriented link to the device.
///
/// Handles are owned by exactly one reader task. `close` consumes the handle
/// so it can only be released once.
pub trait Transport: Send {
    /// Identifier this handle was opened with
    fn endpoint(&self) -> &str;

    /// Block for at most `timeout` waiting for one line
    fn read_line(&mut self, timeout: Duration) -> Result<LineRead, TransportError>;

    /// Release the underlying resource
    fn close(self: Box<Self>) -> Result<(), TransportError>;
}

/// Opens transports and reports what can be opened
pub trait TransportFactory: Send + Sync {
    /// Whether this build/deployment can open transports at all
    fn is_available(&self) -> bool;

    /// Open `endpoint` at `baud_rate`
    fn open(&self, endpoint: &str, baud_rate: u32) -> Result<Box<dyn Transport>, TransportError>;

    /// Enumerate endpoints currently present
    fn available_endpoints(&self) -> Result<Vec<EndpointInfo>, TransportError>;
}

/// Stand-in used when no transport implementation is compiled in
#[derive(Debug, Default)]
pub struct UnavailableTransportFactory;

impl TransportFactory for UnavailableTransportFactory {
    fn is_available(&self) -> bool {
        false
    }

    fn open(&self, _endpoint: &str, _baud_rate: u32) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::Unavailable)
    }

    fn available_endpoints(&self) -> Result<Vec<EndpointInfo>, TransportError> {
        Err(TransportError::Unavailable)
    }
}
