//! Management API Types

use crate::connection::ConnectionState;
use crate::model::FeatureVector;
use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: SystemTime::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub checks: HashMap<String, CheckResult>,
    pub timestamp: SystemTime,
}

/// Individual health check result
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: Option<String>,
}

/// Link status: the snapshot plus service-level facts
#[derive(Debug, Serialize)]
pub struct LinkStatus {
    #[serde(flatten)]
    pub state: ConnectionState,
    pub transport_available: bool,
    pub uptime_seconds: u64,
}

/// Connect request
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub port: String,
    pub baud_rate: Option<u32>,
}

/// Outcome of a connect, read after the grace delay
#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub connected: bool,
    pub endpoint_id: Option<String>,
    pub error: Option<String>,
}

/// Manual prediction request, field names as the dashboard form sends them
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(alias = "temperature")]
    pub temp: f64,
    pub gas: f64,
    pub moisture: f64,
}

impl From<&PredictRequest> for FeatureVector {
    fn from(request: &PredictRequest) -> Self {
        FeatureVector::new(request.temp, request.gas, request.moisture)
    }
}

/// Scored and classified prediction
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub score: f64,
    pub level: RiskLevel,
    pub status: String,
    pub color: String,
    pub features: FeatureVector,
}
