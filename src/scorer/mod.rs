//! Transaction scoring: model path with post-hoc adjustment, or heuristic
//! fallback when no model is loaded.

pub mod adjustment;
pub mod heuristic;
pub mod jitter;

use crate::config::{AppConfig, ModelsConfig};
use crate::feature_extractor::{FeatureError, FeatureExtractor};
use crate::models::inference::{Classifier, OnnxClassifier};
use crate::types::prediction::{PredictionResult, ScoringMode};
use crate::types::transaction::TransactionRequest;
use jitter::Jitter;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Tier condition in an ordered scoring table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Strictly greater than
    Above(f64),
    /// Strictly less than
    Below(f64),
}

impl Threshold {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Threshold::Above(limit) => value > limit,
            Threshold::Below(limit) => value < limit,
        }
    }

    /// Same condition with the limit multiplied by `scale`
    pub fn scaled(&self, scale: f64) -> Threshold {
        match *self {
            Threshold::Above(limit) => Threshold::Above(limit * scale),
            Threshold::Below(limit) => Threshold::Below(limit * scale),
        }
    }
}

/// Delta of the first matching tier, or 0.0
pub fn first_match(value: f64, table: &[(Threshold, f64)]) -> f64 {
    table
        .iter()
        .find(|(threshold, _)| threshold.matches(value))
        .map(|(_, delta)| *delta)
        .unwrap_or(0.0)
}

/// Errors raised while scoring a transaction
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error("{0:#}")]
    Inference(anyhow::Error),
}

/// The classifier shared by all requests, or its absence
#[derive(Clone)]
pub enum ModelHandle {
    Loaded(Arc<dyn Classifier>),
    Absent,
}

impl ModelHandle {
    /// Load the configured model; any failure leaves the service in fallback mode
    pub fn load(config: &ModelsConfig) -> Self {
        let path = Path::new(&config.model_path);
        if !path.exists() {
            warn!(
                path = %path.display(),
                "Model file not found, using heuristic fallback scoring"
            );
            return ModelHandle::Absent;
        }

        match OnnxClassifier::load(config) {
            Ok(classifier) => {
                info!(model = %classifier.name(), "ML model loaded successfully");
                ModelHandle::Loaded(Arc::new(classifier))
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(
                    path = %path.display(),
                    error = %message,
                    "Error loading model, using heuristic fallback scoring"
                );
                ModelHandle::Absent
            }
        }
    }

    pub fn mode(&self) -> ScoringMode {
        match self {
            ModelHandle::Loaded(_) => ScoringMode::Model,
            ModelHandle::Absent => ScoringMode::Fallback,
        }
    }
}

/// Scores transactions against the shared model handle
pub struct Scorer {
    model: ModelHandle,
    extractor: FeatureExtractor,
    jitter: Jitter,
}

impl Scorer {
    pub fn new(model: ModelHandle, jitter: Jitter) -> Self {
        Self {
            model,
            extractor: FeatureExtractor::new(),
            jitter,
        }
    }

    /// Build a scorer from configuration, loading the model once
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ModelHandle::load(&config.models),
            Jitter::from_enabled(config.scoring.jitter),
        )
    }

    /// Which path requests will take
    pub fn mode(&self) -> ScoringMode {
        self.model.mode()
    }

    /// Score a single transaction.
    ///
    /// On the model path the fraud flag is the classifier's own label; only the
    /// reported probability carries the post-hoc adjustments. The heuristic
    /// works on the raw `f64` fields, so only the model path can reject a
    /// transaction whose values overflow `f32`.
    pub fn score(&self, tx: &TransactionRequest) -> Result<PredictionResult, ScoringError> {
        let result = match &self.model {
            ModelHandle::Loaded(classifier) => {
                let features = self.extractor.extract(tx)?;
                let output = classifier
                    .predict(&features)
                    .map_err(ScoringError::Inference)?;
                let probability =
                    adjustment::adjust(output.positive_probability(), tx, &self.jitter);

                debug!(
                    model = %classifier.name(),
                    label = output.label,
                    raw_probability = ?output.probability,
                    adjusted_probability = probability,
                    "Model prediction"
                );

                PredictionResult::new(output.label, probability)
            }
            ModelHandle::Absent => heuristic::score(tx, &self.jitter),
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::ClassifierOutput;
    use crate::types::transaction::TransactionType;

    struct StubClassifier(anyhow::Result<ClassifierOutput>);

    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            "stub"
        }

        fn predict(&self, features: &[f32]) -> anyhow::Result<ClassifierOutput> {
            assert_eq!(features.len(), 8);
            match &self.0 {
                Ok(output) => Ok(*output),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn model_scorer(label: bool, probability: Option<f64>) -> Scorer {
        let stub = StubClassifier(Ok(ClassifierOutput { label, probability }));
        Scorer::new(ModelHandle::Loaded(Arc::new(stub)), Jitter::NONE)
    }

    #[test]
    fn test_first_match() {
        let table = [(Threshold::Above(10.0), 2.0), (Threshold::Below(1.0), -1.0)];
        assert_eq!(first_match(11.0, &table), 2.0);
        assert_eq!(first_match(0.5, &table), -1.0);
        assert_eq!(first_match(5.0, &table), 0.0);
        assert!(Threshold::Above(1.1).scaled(1000.0).matches(1150.0));
    }

    #[test]
    fn test_missing_model_file_is_fallback() {
        let config = ModelsConfig {
            model_path: "no/such/model.onnx".to_string(),
            onnx_threads: 1,
        };
        let handle = ModelHandle::load(&config);
        assert_eq!(handle.mode(), ScoringMode::Fallback);
    }

    #[test]
    fn test_fallback_path() {
        let scorer = Scorer::new(ModelHandle::Absent, Jitter::NONE);
        let tx = TransactionRequest::new(TransactionType::Payment, 50.0);

        let result = scorer.score(&tx).unwrap();

        assert_eq!(scorer.mode(), ScoringMode::Fallback);
        assert_eq!(result.fraud_probability, 0.03);
        assert!(!result.is_fraud);
    }

    #[test]
    fn test_model_label_survives_adjustment() {
        // PAYMENT scales 0.9 down to 0.36, but the classifier said fraud
        let scorer = model_scorer(true, Some(0.9));
        let tx = TransactionRequest::new(TransactionType::Payment, 1_000.0);

        let result = scorer.score(&tx).unwrap();

        assert_eq!(scorer.mode(), ScoringMode::Model);
        assert!(result.is_fraud);
        assert_eq!(result.fraud_probability, 0.36);
    }

    #[test]
    fn test_negative_label_with_raised_probability() {
        let scorer = model_scorer(false, Some(0.45));
        let tx = TransactionRequest::new(TransactionType::CashOut, 200_000.0)
            .with_origin(200_000.0, 0.0);

        let result = scorer.score(&tx).unwrap();

        assert!(!result.is_fraud);
        assert_eq!(result.fraud_probability, 0.79);
    }

    #[test]
    fn test_label_used_when_no_probability_output() {
        let scorer = model_scorer(true, None);
        let tx = TransactionRequest::new(TransactionType::Debit, 1_000.0);

        let result = scorer.score(&tx).unwrap();

        assert!(result.is_fraud);
        assert_eq!(result.fraud_probability, 1.0);
    }

    #[test]
    fn test_inference_failure_is_reported() {
        let stub = StubClassifier(Err(anyhow::anyhow!("session exploded")));
        let scorer = Scorer::new(ModelHandle::Loaded(Arc::new(stub)), Jitter::NONE);
        let tx = TransactionRequest::new(TransactionType::Debit, 1_000.0);

        let err = scorer.score(&tx).unwrap_err();

        assert!(matches!(err, ScoringError::Inference(_)));
        assert_eq!(err.to_string(), "session exploded");
    }

    #[test]
    fn test_inference_error_keeps_context_chain() {
        struct ShapeMismatch;

        impl Classifier for ShapeMismatch {
            fn name(&self) -> &str {
                "shape-mismatch"
            }

            fn predict(&self, _features: &[f32]) -> anyhow::Result<ClassifierOutput> {
                Err(anyhow::anyhow!("shape mismatch").context("Failed to run session"))
            }
        }

        let scorer = Scorer::new(ModelHandle::Loaded(Arc::new(ShapeMismatch)), Jitter::NONE);
        let tx = TransactionRequest::new(TransactionType::Debit, 1_000.0);

        let err = scorer.score(&tx).unwrap_err();

        assert_eq!(err.to_string(), "Failed to run session: shape mismatch");
    }

    #[test]
    fn test_feature_failure_is_reported_on_model_path() {
        let scorer = model_scorer(false, Some(0.1));
        let tx = TransactionRequest::new(TransactionType::Debit, 1e39);

        let err = scorer.score(&tx).unwrap_err();

        assert!(matches!(err, ScoringError::Feature(_)));
        assert_eq!(err.to_string(), "non-finite feature amount");
    }

    #[test]
    fn test_fallback_scores_values_beyond_f32() {
        let scorer = Scorer::new(ModelHandle::Absent, Jitter::NONE);
        let tx = TransactionRequest::new(TransactionType::CashOut, 1e39).with_origin(1e39, 0.0);

        let result = scorer.score(&tx).unwrap();

        assert!(result.is_fraud);
        assert_eq!(result.fraud_probability, 0.77);
    }
}
