//! Fraud Scoring Service Library
//!
//! Scores financial transactions with a pre-trained ONNX classifier, falling
//! back to a heuristic scorer when no model is available, and serves the
//! result over HTTP.

pub mod config;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod scorer;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use metrics::ScoringMetrics;
pub use models::inference::{Classifier, OnnxClassifier};
pub use scorer::{ModelHandle, Scorer, ScoringError};
pub use server::{router, AppState};
pub use types::{prediction::PredictionResult, transaction::TransactionRequest};
