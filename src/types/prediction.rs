//! Prediction report data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary risk classification derived from the predicted probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    /// Threshold the probability at 0.5. Exactly 0.5 is Low.
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.5 {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "High Risk"),
            RiskLevel::Low => write!(f, "Low Risk"),
        }
    }
}

/// Result of one prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Unique report identifier
    pub report_id: String,

    /// Predicted probability of unplanned reoperation (0.0 - 1.0)
    pub probability: f64,

    /// Risk classification at the fixed 0.5 threshold
    pub risk_level: RiskLevel,

    /// True when the probability came from the plain-predict fallback and is
    /// a class label rather than a calibrated probability
    pub approximate: bool,

    /// Report generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionReport {
    /// Build a report from a predicted probability.
    pub fn from_probability(probability: f64, approximate: bool) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            probability,
            risk_level: RiskLevel::from_probability(probability),
            approximate,
            timestamp: Utc::now(),
        }
    }

    /// Probability as a percentage to one decimal, e.g. "73.0%".
    pub fn probability_percent(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_thresholding() {
        assert_eq!(RiskLevel::from_probability(0.73), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.51), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.49), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn test_boundary_probability_is_low_risk() {
        assert_eq!(RiskLevel::from_probability(0.5), RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_display() {
        assert_eq!(RiskLevel::High.to_string(), "High Risk");
        assert_eq!(RiskLevel::Low.to_string(), "Low Risk");
    }

    #[test]
    fn test_report_from_probability() {
        let report = PredictionReport::from_probability(0.73, false);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.probability_percent(), "73.0%");
        assert!(!report.approximate);

        let report = PredictionReport::from_probability(0.5, false);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.probability_percent(), "50.0%");
    }

    #[test]
    fn test_report_serialization() {
        let report = PredictionReport::from_probability(0.42, true);

        let json = serde_json::to_string(&report).unwrap();
        let deserialized: PredictionReport = serde_json::from_str(&json).unwrap();

        assert_eq!(report.report_id, deserialized.report_id);
        assert_eq!(report.probability, deserialized.probability);
        assert_eq!(report.risk_level, deserialized.risk_level);
        assert!(deserialized.approximate);
    }
}
