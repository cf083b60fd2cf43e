//! ML model inference components

pub mod inference;
pub mod loader;

pub use inference::{Classifier, ClassifierOutput, OnnxClassifier};
pub use loader::ModelLoader;
