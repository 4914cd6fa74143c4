//! Management API Handlers

use super::types::*;
use crate::connection::{LinkError, LinkManager};
use crate::metrics::Metrics;
use crate::model::{round_score, FeatureVector, RiskModel};
use crate::risk::classify;
use crate::transport::EndpointInfo;
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    Form, Json,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Status code plus JSON body; every handler answers in this shape
pub type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub link: Arc<LinkManager>,
    pub model: Option<Arc<dyn RiskModel>>,
    pub metrics: Arc<Metrics>,
    pub default_baud_rate: u32,
    pub connect_grace: Duration,
    pub start_time: SystemTime,
}

impl AppState {
    fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_secs()
    }

    fn link_status(&self) -> LinkStatus {
        LinkStatus {
            state: self.link.snapshot(),
            transport_available: self.link.transport_available(),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

fn ok<T>(data: T) -> ApiResult<T> {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, Json(ApiResponse::error(message.into())))
}

fn link_error_status(err: &LinkError) -> StatusCode {
    match err {
        LinkError::Configuration(_) => StatusCode::BAD_REQUEST,
        LinkError::TransportOpen { .. } => StatusCode::BAD_GATEWAY,
        LinkError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let mut checks = HashMap::new();

    checks.insert(
        "server".to_string(),
        CheckResult {
            status: "healthy".to_string(),
            message: Some("Server is running".to_string()),
        },
    );

    let transport = if state.link.transport_available() {
        CheckResult {
            status: "healthy".to_string(),
            message: Some("Transport subsystem available".to_string()),
        }
    } else {
        CheckResult {
            status: "degraded".to_string(),
            message: Some("Transport subsystem not available".to_string()),
        }
    };
    checks.insert("transport".to_string(), transport);

    checks.insert(
        "model".to_string(),
        CheckResult {
            status: if state.model.is_some() { "healthy" } else { "degraded" }.to_string(),
            message: Some(
                if state.model.is_some() {
                    "Prediction model loaded"
                } else {
                    "No prediction model configured"
                }
                .to_string(),
            ),
        },
    );

    let overall_status = if checks.values().all(|c| c.status == "healthy") {
        "healthy"
    } else {
        "degraded"
    };

    let health = HealthStatus {
        status: overall_status.to_string(),
        checks,
        timestamp: SystemTime::now(),
    };

    Json(ApiResponse::success(health))
}

/// Current link snapshot
pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<LinkStatus>> {
    Json(ApiResponse::success(state.link_status()))
}

/// Enumerate endpoints
pub async fn list_ports(State(state): State<AppState>) -> ApiResult<Vec<EndpointInfo>> {
    match state.link.available_endpoints().await {
        Ok(endpoints) => ok(endpoints),
        Err(e) => {
            warn!("Port enumeration failed: {}", e);
            fail(link_error_status(&e), e.to_string())
        }
    }
}

/// Connect to a port and report the outcome after the grace delay
pub async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> ApiResult<ConnectResponse> {
    let baud_rate = request.baud_rate.unwrap_or(state.default_baud_rate);

    match state.link.connect(&request.port, baud_rate).await {
        Ok(()) => {
            tokio::time::sleep(state.connect_grace).await;
            let snapshot = state.link.snapshot();
            info!("Connect requested via management API: {}", request.port);
            ok(ConnectResponse {
                connected: snapshot.connected,
                endpoint_id: snapshot.endpoint_id,
                error: snapshot.last_error,
            })
        }
        Err(LinkError::TransportOpen { message, .. }) => ok(ConnectResponse {
            connected: false,
            endpoint_id: None,
            error: Some(message),
        }),
        Err(e) => fail(link_error_status(&e), e.to_string()),
    }
}

/// Disconnect and return the resulting status
pub async fn disconnect(State(state): State<AppState>) -> Json<ApiResponse<LinkStatus>> {
    state.link.disconnect().await;
    info!("Disconnect requested via management API");
    Json(ApiResponse::success(state.link_status()))
}

/// Score submitted readings, sent as JSON or as an HTML form
pub async fn predict(State(state): State<AppState>, request: Request) -> ApiResult<PredictionResponse> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    let parsed = if is_form {
        Form::<PredictRequest>::from_request(request, &state)
            .await
            .map(|Form(body)| body)
            .map_err(|rejection| (rejection.status(), rejection.body_text()))
    } else {
        Json::<PredictRequest>::from_request(request, &state)
            .await
            .map(|Json(body)| body)
            .map_err(|rejection| (rejection.status(), rejection.body_text()))
    };

    match parsed {
        Ok(body) => score(&state, FeatureVector::from(&body)),
        Err((status, message)) => {
            debug!("Rejected prediction request: {}", message);
            fail(status, message)
        }
    }
}

/// Score the latest reading from the live link
pub async fn predict_live(State(state): State<AppState>) -> ApiResult<PredictionResponse> {
    let snapshot = state.link.snapshot();
    match snapshot.last_reading.and_then(|reading| reading.complete()) {
        Some((temperature, gas, moisture)) => {
            score(&state, FeatureVector::new(temperature, gas, moisture))
        }
        None => fail(
            StatusCode::CONFLICT,
            "No complete sensor reading available",
        ),
    }
}

fn score(state: &AppState, features: FeatureVector) -> ApiResult<PredictionResponse> {
    let Some(model) = &state.model else {
        return fail(
            StatusCode::SERVICE_UNAVAILABLE,
            "No prediction model configured",
        );
    };

    match model.predict(&features) {
        Ok(score) => {
            let assessment = classify(score);
            state.metrics.record_prediction();
            ok(PredictionResponse {
                score: round_score(score),
                level: assessment.level,
                status: assessment.label.to_string(),
                color: assessment.color.to_string(),
                features,
            })
        }
        Err(e) => {
            error!("Prediction failed: {:#}", e);
            fail(StatusCode::INTERNAL_SERVER_ERROR, format!("Prediction failed: {}", e))
        }
    }
}

/// Prometheus text exposition
pub async fn export_metrics(State(state): State<AppState>) -> String {
    state.metrics.export_prometheus()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::LinkSettings;
    use crate::model::LinearModel;
    use crate::transport::MockTransportFactory;
    use axum::body::Body;

    fn predict_request(content_type: &str, body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/v1/predict")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn create_test_state(model: Option<Arc<dyn RiskModel>>) -> AppState {
        let metrics = Arc::new(Metrics::new());
        let link = LinkManager::new(
            Arc::new(MockTransportFactory::new()),
            LinkSettings {
                read_timeout: Duration::from_millis(50),
                stop_timeout: Duration::from_secs(1),
            },
            Arc::clone(&metrics),
        );
        AppState {
            link: Arc::new(link),
            model,
            metrics,
            default_baud_rate: 9600,
            connect_grace: Duration::from_millis(10),
            start_time: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_health_check_without_model() {
        let response = health_check(State(create_test_state(None))).await;
        let health = response.0.data.unwrap();
        assert_eq!(health.status, "degraded");
        assert_eq!(health.checks["transport"].status, "healthy");
    }

    #[tokio::test]
    async fn test_get_status() {
        let response = get_status(State(create_test_state(None))).await;
        let status = response.0.data.unwrap();
        assert!(!status.state.connected);
        assert!(status.transport_available);
    }

    #[tokio::test]
    async fn test_predict_classifies_score() {
        let model: Arc<dyn RiskModel> = Arc::new(LinearModel::new(0.0, [1.0, 0.0, 0.0]));
        let state = create_test_state(Some(model));
        let request = predict_request(
            "application/json",
            r#"{"temp":72.456,"gas":1713,"moisture":76}"#,
        );

        let (status, response) = predict(State(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        let prediction = response.0.data.unwrap();
        assert_eq!(prediction.score, 72.46);
        assert_eq!(prediction.status, "High Infection Risk");
        assert_eq!(prediction.color, "red");
        assert!(state.metrics.export_prometheus().contains("sensorlink_predictions_total 1"));
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let request = predict_request(
            "application/json",
            r#"{"temp":33.09,"gas":1713,"moisture":76}"#,
        );
        let (status, response) = predict(State(create_test_state(None)), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.0.error.is_some());
    }

    #[tokio::test]
    async fn test_predict_accepts_form_fields() {
        let model: Arc<dyn RiskModel> = Arc::new(LinearModel::new(0.0, [1.0, 0.0, 0.0]));
        let request = predict_request(
            "application/x-www-form-urlencoded",
            "temp=33.09&gas=1713&moisture=76.00",
        );

        let (status, response) = predict(State(create_test_state(Some(model))), request).await;
        assert_eq!(status, StatusCode::OK);
        let prediction = response.0.data.unwrap();
        assert_eq!(prediction.score, 33.09);
        assert_eq!(prediction.features.moisture, 76.0);
        assert_eq!(prediction.status, "Low Risk");
    }

    #[tokio::test]
    async fn test_predict_rejects_incomplete_form() {
        let model: Arc<dyn RiskModel> = Arc::new(LinearModel::new(0.0, [1.0, 0.0, 0.0]));
        let request = predict_request("application/x-www-form-urlencoded", "temp=33.09&gas=1713");

        let (status, response) = predict(State(create_test_state(Some(model))), request).await;
        assert!(status.is_client_error());
        assert!(!response.0.success);
    }

    #[tokio::test]
    async fn test_predict_live_requires_reading() {
        let model: Arc<dyn RiskModel> = Arc::new(LinearModel::new(10.0, [0.0, 0.0, 0.0]));
        let (status, _) = predict_live(State(create_test_state(Some(model)))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_port() {
        let request = ConnectRequest {
            port: String::new(),
            baud_rate: None,
        };
        let (status, response) = connect(State(create_test_state(None)), Json(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!response.0.success);
    }
}
