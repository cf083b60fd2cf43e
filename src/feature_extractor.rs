//! Feature extraction for fraud model inference.
//!
//! Builds the feature vector in the column order the classifier was trained
//! with: the six raw transaction fields followed by the two engineered
//! balance differences.

use crate::types::transaction::TransactionRequest;
use thiserror::Error;

/// Number of model input columns
pub const FEATURE_COUNT: usize = 8;

/// Column names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "type",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
    "balanceDiffOrig",
    "balanceDiffDest",
];

/// Errors raised while building features
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("non-finite feature {name}")]
    NonFinite { name: &'static str },
}

/// Feature extractor that transforms transactions into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a transaction.
    ///
    /// The transaction type is passed as its label-encoder code. Every column
    /// must be finite after the `f32` narrowing.
    pub fn extract(&self, tx: &TransactionRequest) -> Result<Vec<f32>, FeatureError> {
        let features = vec![
            tx.kind.category_code(),
            tx.amount as f32,
            tx.old_balance_origin as f32,
            tx.new_balance_origin as f32,
            tx.old_balance_destination as f32,
            tx.new_balance_destination as f32,
            // Engineered
            tx.balance_diff_origin() as f32,
            tx.balance_diff_destination() as f32,
        ];

        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(FeatureError::NonFinite {
                name: FEATURE_NAMES[index],
            });
        }

        Ok(features)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in model input order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
