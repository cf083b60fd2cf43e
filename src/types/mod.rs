//! Type definitions for the fraud scoring service

pub mod prediction;
pub mod transaction;

pub use prediction::{HealthStatus, PredictionResult, ScoringMode};
pub use transaction::{TransactionRequest, TransactionType};
