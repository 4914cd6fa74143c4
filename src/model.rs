//! Prediction Model
//!
//! The risk model is trained offline. This module defines the seam the
//! service scores through and a linear model that loads exported
//! coefficients from JSON.

use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model inputs, in training feature order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Gas sensor index
    pub gas: f64,
    /// Moisture in percent
    pub moisture: f64,
}

impl FeatureVector {
    pub fn new(temperature: f64, gas: f64, moisture: f64) -> Self {
        Self {
            temperature,
            gas,
            moisture,
        }
    }

    /// Features as `[temperatureC, gas_index, moisture_percent]`
    pub fn as_array(&self) -> [f64; 3] {
        [self.temperature, self.gas, self.moisture]
    }
}

/// Anything that turns a feature vector into a risk score
pub trait RiskModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// `intercept + coefficients · features`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: [f64; 3],
}

impl LinearModel {
    pub fn new(intercept: f64, coefficients: [f64; 3]) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Load coefficients exported as JSON
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;

        let model: LinearModel = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model file: {}", path.display()))?;

        if !model.intercept.is_finite() || model.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("Model file {} contains non-finite coefficients", path.display());
        }

        tracing::info!(path = %path.display(), "Loaded linear risk model");
        Ok(model)
    }
}

impl RiskModel for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let score = self
            .coefficients
            .iter()
            .zip(features.as_array())
            .fold(self.intercept, |acc, (w, x)| acc + w * x);

        if !score.is_finite() {
            bail!("Model produced a non-finite score");
        }
        Ok(score)
    }
}

/// Round a score to two decimals for display
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
