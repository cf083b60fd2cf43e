//! Classifier abstraction and the ONNX Runtime implementation

use crate::config::ModelsConfig;
use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Raw output of a binary classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    /// Predicted class (true = fraud)
    pub label: bool,
    /// Positive-class probability, when the model exposes one
    pub probability: Option<f64>,
}

impl ClassifierOutput {
    /// Positive-class probability, or the label cast to a float
    pub fn positive_probability(&self) -> f64 {
        self.probability
            .unwrap_or(if self.label { 1.0 } else { 0.0 })
    }
}

/// A trained binary classifier over the fixed feature vector
pub trait Classifier: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    /// Predict label and (optionally) probability for one feature vector
    fn predict(&self, features: &[f32]) -> Result<ClassifierOutput>;
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    name: String,
    /// Running a session needs exclusive access
    model: Mutex<LoadedModel>,
}

impl OnnxClassifier {
    /// Load the classifier described by the models configuration
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let model = loader.load_model(&config.model_path)?;
        Ok(Self::from_loaded(model))
    }

    pub fn from_loaded(model: LoadedModel) -> Self {
        Self {
            name: model.name.clone(),
            model: Mutex::new(model),
        }
    }

    /// Extract the predicted label from an int64 label tensor
    fn extract_label(output: &ort::value::DynValue) -> Result<bool> {
        let (_, data) = output
            .try_extract_tensor::<i64>()
            .context("Label output is not an int64 tensor")?;
        let label = data
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Empty label tensor"))?;
        Ok(label == 1)
    }

    /// Extract fraud probability from model output.
    /// Handles both tensor outputs and seq(map) outputs (ZipMap exports)
    fn extract_probability(output: &ort::value::DynValue, model_name: &str) -> Result<f64> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = fraud_prob_from_tensor(&shape, data)?;
            debug!(model = %model_name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return Self::extract_from_sequence_map(output, model_name);
        }

        anyhow::bail!("Unsupported probability output type {:?}", output.dtype())
    }

    /// Extract probability from seq(map(int64, float)) format
    fn extract_from_sequence_map(output: &ort::value::DynValue, model_name: &str) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        // batch size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
            debug!(model = %model_name, prob = *prob, "Extracted from seq(map)");
            return Ok(*prob as f64);
        }

        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
            return Ok(1.0 - *prob as f64);
        }

        Err(anyhow::anyhow!("No probability found in map"))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f32]) -> Result<ClassifierOutput> {
        use ort::value::Tensor;

        let shape = vec![1_i64, features.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, features.to_vec())).context("Failed to create input tensor")?;

        let mut model = lock_session(&self.model, &self.name);
        let LoadedModel {
            session,
            input_name,
            label_name,
            probability_name,
            ..
        } = &mut *model;

        let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;

        let label_output = outputs
            .get(label_name.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing output {}", label_name))?;
        let label = Self::extract_label(label_output)?;

        let probability = match probability_name {
            Some(name) => {
                let output = outputs
                    .get(name.as_str())
                    .ok_or_else(|| anyhow::anyhow!("Missing output {}", name))?;
                Some(Self::extract_probability(output, &self.name)?)
            }
            None => None,
        };

        Ok(ClassifierOutput { label, probability })
    }
}

/// Lock a session, recovering it if an earlier holder panicked
fn lock_session<'a, T>(session: &'a Mutex<T>, model_name: &str) -> MutexGuard<'a, T> {
    session.lock().unwrap_or_else(|poisoned| {
        warn!(model = %model_name, "Session lock poisoned by a panicked request, recovering");
        PoisonError::into_inner(poisoned)
    })
}

/// Extract fraud probability from tensor data.
///
/// Accepts `[batch, n_classes]`, `[n_classes]` and single-probability shapes.
fn fraud_prob_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> Result<f64> {
    let dims: Vec<i64> = shape.iter().copied().collect();
    let num_classes = dims.last().copied().unwrap_or(0);

    let value = match num_classes {
        n if n >= 2 => data.get(1),
        1 => data.first(),
        _ => data.last(),
    };

    value
        .map(|&v| v as f64)
        .ok_or_else(|| anyhow::anyhow!("Empty probability tensor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisoned_session_lock_is_recovered() {
        let session = std::sync::Arc::new(Mutex::new(7_u32));

        let poisoner = std::sync::Arc::clone(&session);
        let panicked = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("inference panicked");
        })
        .join();

        assert!(panicked.is_err());
        assert!(session.is_poisoned());
        assert_eq!(*lock_session(&*session, "test"), 7);
        assert_eq!(*lock_session(&*session, "test"), 7);
    }

    #[test]
    fn test_positive_probability_prefers_model_output() {
        let output = ClassifierOutput {
            label: false,
            probability: Some(0.42),
        };
        assert_eq!(output.positive_probability(), 0.42);
    }

    #[test]
    fn test_positive_probability_falls_back_to_label() {
        let fraud = ClassifierOutput {
            label: true,
            probability: None,
        };
        let legit = ClassifierOutput {
            label: false,
            probability: None,
        };
        assert_eq!(fraud.positive_probability(), 1.0);
        assert_eq!(legit.positive_probability(), 0.0);
    }
}
