//! Management API Integration Tests

use sensorlink::{
    management::{AppState, ManagementServer},
    metrics::Metrics,
    model::{LinearModel, RiskModel},
    transport::{MockBehavior, MockTransportFactory},
    LinkManager, LinkSettings,
};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const RECORD: &str = r#"{"temperature":33.09,"gas":1713,"moisture":76}"#;

fn create_state(factory: &MockTransportFactory, model: Option<Arc<dyn RiskModel>>) -> AppState {
    let metrics = Arc::new(Metrics::new());
    let link = LinkManager::new(
        Arc::new(factory.clone()),
        LinkSettings {
            read_timeout: Duration::from_millis(50),
            stop_timeout: Duration::from_secs(2),
        },
        Arc::clone(&metrics),
    );
    AppState {
        link: Arc::new(link),
        model,
        metrics,
        default_baud_rate: 9600,
        connect_grace: Duration::from_millis(100),
        start_time: SystemTime::now(),
    }
}

fn create_router(state: AppState) -> Router {
    ManagementServer::new("127.0.0.1:5005".parse().unwrap(), state, true).create_test_router()
}

fn temperature_model() -> Arc<dyn RiskModel> {
    Arc::new(LinearModel::new(0.0, [1.0, 0.0, 0.0]))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_management_api_health_endpoint() {
    let factory = MockTransportFactory::new();
    let app = create_router(create_state(&factory, Some(temperature_model())));

    let (status, body) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_management_api_status_endpoint() {
    let factory = MockTransportFactory::new();
    let app = create_router(create_state(&factory, None));

    let (status, body) = send(&app, get("/api/v1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["connected"], false);
    assert_eq!(body["data"]["transport_available"], true);
    assert!(body["data"]["last_reading"].is_null());
}

#[tokio::test]
async fn test_management_api_connect_and_disconnect() {
    let factory = MockTransportFactory::new();
    factory.set_behavior("COM3", MockBehavior::Lines(vec![RECORD.to_string()]));
    let state = create_state(&factory, None);
    let app = create_router(state.clone());

    let (status, body) = send(&app, post_json("/api/v1/connect", json!({"port": "COM3"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], true);
    assert_eq!(body["data"]["endpoint_id"], "COM3");

    let deadline = Instant::now() + Duration::from_secs(2);
    while state.link.snapshot().last_reading.is_none() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (_, body) = send(&app, get("/api/v1/status")).await;
    assert_eq!(body["data"]["connected"], true);
    assert_eq!(body["data"]["last_reading"]["temperature"], 33.09);
    assert_eq!(body["data"]["last_reading"]["gas"], 1713.0);

    let (status, body) = send(&app, post_json("/api/v1/disconnect", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], false);
    assert!(body["data"]["last_reading"].is_null());
    assert_eq!(factory.open_handles(), 0);
}

#[tokio::test]
async fn test_management_api_connect_failure_is_reported() {
    let factory = MockTransportFactory::new();
    factory.set_behavior("COM9", MockBehavior::FailOpen("access denied".into()));
    let app = create_router(create_state(&factory, None));

    let (status, body) = send(&app, post_json("/api/v1/connect", json!({"port": "COM9"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], false);
    assert_eq!(body["data"]["error"], "access denied");

    let (_, body) = send(&app, get("/api/v1/status")).await;
    assert!(body["data"]["last_error"]
        .as_str()
        .unwrap()
        .contains("access denied"));
}

#[tokio::test]
async fn test_management_api_connect_without_transport() {
    let factory = MockTransportFactory::unavailable();
    let app = create_router(create_state(&factory, None));

    let (status, body) = send(&app, post_json("/api/v1/connect", json!({"port": "COM3"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, get("/api/v1/ports")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_management_api_predict() {
    let factory = MockTransportFactory::new();
    let app = create_router(create_state(&factory, Some(temperature_model())));

    let (status, body) = send(
        &app,
        post_json("/api/v1/predict", json!({"temp": 33.094, "gas": 1713, "moisture": 76})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 33.09);
    assert_eq!(body["data"]["level"], "low");
    assert_eq!(body["data"]["status"], "Low Risk");
    assert_eq!(body["data"]["color"], "green");
}

#[tokio::test]
async fn test_management_api_predict_form_encoded() {
    let factory = MockTransportFactory::new();
    let app = create_router(create_state(&factory, Some(temperature_model())));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("temp=33.09&gas=1713&moisture=76.00"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 33.09);
    assert_eq!(body["data"]["features"]["gas"], 1713.0);
    assert_eq!(body["data"]["status"], "Low Risk");
    assert_eq!(body["data"]["color"], "green");
}

#[tokio::test]
async fn test_management_api_predict_live() {
    let factory = MockTransportFactory::new();
    factory.set_behavior(
        "COM3",
        MockBehavior::Lines(vec![r#"{"temperature":55,"gas":1500,"moisture":70}"#.to_string()]),
    );
    let state = create_state(&factory, Some(temperature_model()));
    let app = create_router(state.clone());

    let (status, _) = send(&app, get("/api/v1/predict/live")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    state.link.connect("COM3", 9600).await.unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    while state.link.snapshot().last_reading.is_none() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, body) = send(&app, get("/api/v1/predict/live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 55.0);
    assert_eq!(body["data"]["status"], "Moderate Risk");
    assert_eq!(body["data"]["color"], "orange");

    state.link.disconnect().await;
}

#[tokio::test]
async fn test_management_api_metrics_endpoint() {
    let factory = MockTransportFactory::new();
    let app = create_router(create_state(&factory, None));

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("sensorlink_link_connected"));
}
