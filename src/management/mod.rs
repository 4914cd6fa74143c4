//! Management API Module
//! 
//! REST API exposing the sensor link and risk prediction to dashboards.

pub mod api;
pub mod handlers;
pub mod server;
pub mod types;

pub use api::ManagementApi;
pub use handlers::AppState;
pub use server::ManagementServer;
pub use types::*;
