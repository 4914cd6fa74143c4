//! Connection Management Module
//! 
//! Owns the sensor link lifecycle: the open transport, the background reader
//! and the shared snapshot of the latest reading.

pub mod error;
pub mod manager;
mod reader;
pub mod state;

pub use error::LinkError;
pub use manager::{LinkManager, LinkSettings};
pub use state::ConnectionState;
