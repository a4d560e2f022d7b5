//! Recoverable error types for encoding and inference.
//!
//! Load-time failures (missing model or encoder artifacts, bad configuration)
//! are reported through `anyhow` and abort the invocation. The errors here
//! never cross the pipeline boundary: each one is absorbed by the component
//! that raises it and replaced by a fallback value.

use std::path::PathBuf;

/// Failure to encode a categorical value with a trained encoder.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// The encoder has no trained classes, so no fallback code exists.
    #[error("encoder vocabulary is empty")]
    EmptyVocabulary,

    /// The vocabulary position does not fit the model's integer code type.
    #[error("code for class at position {position} is out of range")]
    CodeOutOfRange { position: usize },
}

/// Failure while scoring a feature vector.
///
/// Each variant maps to the default score at the prediction boundary.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The feature vector or model output failed validation.
    #[error("data validation failed: {0}")]
    Validation(String),

    /// Reading model resources failed.
    #[error("model resource access failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model runtime failed to execute.
    #[error("model execution failed: {0}")]
    Execution(String),
}

impl InferenceError {
    /// Short label for diagnostics and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Validation(_) => "validation",
            InferenceError::Io { .. } => "io",
            InferenceError::Execution(_) => "execution",
        }
    }
}

impl From<ort::Error> for InferenceError {
    fn from(e: ort::Error) -> Self {
        InferenceError::Execution(e.to_string())
    }
}
