//! Management API Routes

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Management API router
pub struct ManagementApi;

impl ManagementApi {
    /// Create the management API router
    pub fn create_router(state: AppState, prometheus_enabled: bool) -> Router {
        let api_routes = Router::new()
            .route("/health", get(health_check))
            // Sensor link
            .route("/status", get(get_status))
            .route("/ports", get(list_ports))
            .route("/connect", post(connect))
            .route("/disconnect", post(disconnect))
            // Risk scoring
            .route("/predict", post(predict))
            .route("/predict/live", get(predict_live));

        let mut router = Router::new().nest("/api/v1", api_routes);

        if prometheus_enabled {
            router = router.route("/metrics", get(export_metrics));
        }

        router
            .with_state(state)
            .layer(CorsLayer::permissive()) // Configure CORS as needed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{LinkManager, LinkSettings};
    use crate::metrics::Metrics;
    use crate::transport::MockTransportFactory;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let metrics = Arc::new(Metrics::new());
        AppState {
            link: Arc::new(LinkManager::new(
                Arc::new(MockTransportFactory::new()),
                LinkSettings::default(),
                Arc::clone(&metrics),
            )),
            model: None,
            metrics,
            default_baud_rate: 9600,
            connect_grace: Duration::from_millis(10),
            start_time: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = ManagementApi::create_router(create_test_state(), true);

        let request = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_route_toggle() {
        let request = || {
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap()
        };

        let app = ManagementApi::create_router(create_test_state(), true);
        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = ManagementApi::create_router(create_test_state(), false);
        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = ManagementApi::create_router(create_test_state(), true);

        let request = Request::builder()
            .uri("/api/v1/users")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
