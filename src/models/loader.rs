//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loaded ONNX classifier with resolved input/output names
pub struct LoadedModel {
    /// Model name (file stem)
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output name for the predicted class label
    pub label_name: String,
    /// Output name for class probabilities, if the model exports them
    pub probability_name: Option<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a classifier from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let (label_name, probability_name) = resolve_outputs(&output_names)
            .with_context(|| format!("Model {} exposes no label output: {:?}", name, output_names))?;

        info!(
            model = %name,
            input = %input_name,
            label = %label_name,
            probabilities = ?probability_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            session,
            input_name,
            label_name,
            probability_name,
        })
    }
}

/// Pick the label output and the optional probability output by name.
///
/// Classifier exports name them `label`/`output_label` and
/// `probabilities`/`output_probability`.
fn resolve_outputs(names: &[String]) -> Option<(String, Option<String>)> {
    let label = names.iter().find(|n| n.contains("label"))?.clone();
    let probabilities = names
        .iter()
        .find(|n| n.contains("prob"))
        .cloned();
    Some((label, probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_sklearn_outputs() {
        let resolved = resolve_outputs(&names(&["output_label", "output_probability"]));
        assert_eq!(
            resolved,
            Some(("output_label".to_string(), Some("output_probability".to_string())))
        );
    }

    #[test]
    fn test_resolve_label_only() {
        let resolved = resolve_outputs(&names(&["label"]));
        assert_eq!(resolved, Some(("label".to_string(), None)));
    }

    #[test]
    fn test_resolve_without_label() {
        assert_eq!(resolve_outputs(&names(&["probabilities"])), None);
    }
}
