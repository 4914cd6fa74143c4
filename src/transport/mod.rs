//! Transport Module
//!
//! Abstracts the line-oriented link to the sensing device so the connection
//! manager can run against real serial ports or in-memory fakes.

#[cfg_attr(not(feature = "serial"), allow(dead_code))]
mod line;
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
pub mod types;

pub use mock::{MockBehavior, MockTransportFactory};
#[cfg(feature = "serial")]
pub use serial::SerialTransportFactory;
pub use types::*;

use std::sync::Arc;

/// Factory for the transport compiled into this build.
///
/// Without the `serial` feature the returned factory reports itself as
/// unavailable and refuses to open anything.
pub fn default_factory() -> Arc<dyn TransportFactory> {
    #[cfg(feature = "serial")]
    {
        Arc::new(SerialTransportFactory::new())
    }

    #[cfg(not(feature = "serial"))]
    {
        tracing::warn!("Serial support not compiled in, transport subsystem unavailable");
        Arc::new(UnavailableTransportFactory)
    }
}
