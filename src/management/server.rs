//! Management API Server

use super::{api::ManagementApi, handlers::AppState};
use crate::Result;
use anyhow::Context;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Management API server
pub struct ManagementServer {
    bind_addr: SocketAddr,
    app_state: AppState,
    prometheus_enabled: bool,
}

impl ManagementServer {
    /// Create a new management server
    pub fn new(bind_addr: SocketAddr, app_state: AppState, prometheus_enabled: bool) -> Self {
        Self {
            bind_addr,
            app_state,
            prometheus_enabled,
        }
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting management API server on {}", self.bind_addr);

        let app = ManagementApi::create_router(self.app_state, self.prometheus_enabled);

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind management API server to {}", self.bind_addr))?;

        info!("Management API server listening on {}", self.bind_addr);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Management API server error: {}", e);
            return Err(e.into());
        }

        info!("Management API server stopped");
        Ok(())
    }

    /// Create a router for testing
    pub fn create_test_router(&self) -> Router {
        ManagementApi::create_router(self.app_state.clone(), self.prometheus_enabled)
    }
}
