//! Risk Classification
//!
//! Maps a model score onto the three-tier risk scale shown to operators.

use serde::Serialize;

/// Scores below this are low risk
pub const MODERATE_THRESHOLD: f64 = 40.0;
/// Scores at or above this are high risk
pub const HIGH_THRESHOLD: f64 = 70.0;

/// Risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Infection Risk",
        }
    }

    /// Display color used by dashboards
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "green",
            RiskLevel::Moderate => "orange",
            RiskLevel::High => "red",
        }
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub label: &'static str,
    pub color: &'static str,
}

/// Classify a risk score.
///
/// Total over every `f64`: anything that is neither below 40 nor below 70
/// (including NaN) lands in the high tier.
pub fn classify(score: f64) -> RiskAssessment {
    let level = if score < MODERATE_THRESHOLD {
        RiskLevel::Low
    } else if score < HIGH_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    };

    RiskAssessment {
        level,
        label: level.label(),
        color: level.color(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(classify(39.99).level, RiskLevel::Low);
        assert_eq!(classify(40.0).level, RiskLevel::Moderate);
        assert_eq!(classify(69.99).level, RiskLevel::Moderate);
        assert_eq!(classify(70.0).level, RiskLevel::High);
    }

    #[test]
    fn test_labels_and_colors() {
        let low = classify(39.99);
        assert_eq!(low.label, "Low Risk");
        assert_eq!(low.color, "green");

        let moderate = classify(40.0);
        assert_eq!(moderate.label, "Moderate Risk");
        assert_eq!(moderate.color, "orange");

        let high = classify(70.0);
        assert_eq!(high.label, "High Infection Risk");
        assert_eq!(high.color, "red");
    }

    #[test]
    fn test_extreme_inputs() {
        assert_eq!(classify(f64::NEG_INFINITY).level, RiskLevel::Low);
        assert_eq!(classify(-5.0).level, RiskLevel::Low);
        assert_eq!(classify(f64::INFINITY).level, RiskLevel::High);
        assert_eq!(classify(f64::NAN).level, RiskLevel::High);
    }
}
