//! Response payloads

use serde::{Deserialize, Serialize};

/// Decimal places kept in the reported probability
pub const PROBABILITY_DECIMALS: i32 = 4;

/// Which path produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Trained classifier plus post-hoc adjustment
    Model,
    /// Hand-coded heuristic, used when no model is loaded
    Fallback,
}

/// Outcome of scoring a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Fraud flag
    pub is_fraud: bool,
    /// Fraud probability in [0, 1], rounded to four decimals
    pub fraud_probability: f64,
}

impl PredictionResult {
    /// Build a result, clamping and rounding the probability
    pub fn new(is_fraud: bool, probability: f64) -> Self {
        Self {
            is_fraud,
            fraud_probability: round_probability(probability.clamp(0.0, 1.0)),
        }
    }
}

/// Round half away from zero to [`PROBABILITY_DECIMALS`] places
pub fn round_probability(probability: f64) -> f64 {
    let scale = 10f64.powi(PROBABILITY_DECIMALS);
    (probability * scale).round() / scale
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

impl HealthStatus {
    pub fn up() -> Self {
        Self {
            status: "UP".to_string(),
            service: "ML Model".to_string(),
        }
    }
}
