//! Regressor inference and score clamping

use crate::config::PredictionConfig;
use crate::error::InferenceError;
use crate::feature_assembler::{FeatureVector, FEATURE_COUNT};
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::types::report::PredictionOutcome;
use anyhow::Result;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, error, warn};

/// A trained regressor over the fixed feature schema.
pub trait Regressor {
    /// Model identifier for diagnostics
    fn name(&self) -> &str;

    /// Predict the raw (unclamped) congestion value for one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;
}

/// Regressor backed by an ONNX Runtime session
pub struct OnnxRegressor {
    /// Loaded model (wrapped in RwLock for interior mutability)
    model: RwLock<LoadedModel>,
    name: String,
}

impl OnnxRegressor {
    /// Load a regressor from an ONNX file
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads)?;
        let model = loader.load_model(path)?;
        Ok(Self::from_model(model))
    }

    /// Wrap an already loaded model
    pub fn from_model(model: LoadedModel) -> Self {
        Self {
            name: model.name.clone(),
            model: RwLock::new(model),
        }
    }
}

impl Regressor for OnnxRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        use ort::value::Tensor;

        let mut guard = self
            .model
            .write()
            .map_err(|e| InferenceError::Execution(format!("Lock error: {}", e)))?;
        let model = &mut *guard;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor = Tensor::from_array((shape, features.to_row().to_vec()))
            .map_err(|e| InferenceError::Validation(format!("Failed to create input tensor: {}", e)))?;

        let outputs = model
            .session
            .run(ort::inputs![model.input_name.as_str() => input_tensor])?;

        // Named output first, then any tensor output that is not a label
        if let Some(output) = outputs.get(model.output_name.as_str()) {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    return Ok(f64::from(value));
                }
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    debug!(model = %model.name, output = %name, "Extracted from tensor (fallback)");
                    return Ok(f64::from(value));
                }
            }
        }

        Err(InferenceError::Execution(format!(
            "model {} produced no numeric output",
            model.name
        )))
    }
}

/// Result of scoring one feature vector
#[derive(Debug)]
pub struct Scored {
    /// Score in the configured range
    pub score: f64,
    /// Whether the score came from the model
    pub outcome: PredictionOutcome,
    /// Failure that forced the default score
    pub failure: Option<InferenceError>,
}

/// Runs a regressor and guarantees a score in range.
pub struct PredictionExecutor {
    default_score: f64,
    min_score: f64,
    max_score: f64,
}

impl PredictionExecutor {
    /// Create an executor from configuration.
    ///
    /// An unordered or NaN score range is replaced by the default range.
    pub fn new(config: &PredictionConfig) -> Self {
        let fallback;
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "Invalid prediction settings, using defaults");
                fallback = PredictionConfig::default();
                &fallback
            }
        };

        Self {
            default_score: config.default_score,
            min_score: config.min_score,
            max_score: config.max_score,
        }
    }

    /// Score returned when inference fails
    pub fn default_score(&self) -> f64 {
        self.default_score
    }

    /// Clamp a raw model value into the score range
    pub fn clamp(&self, raw: f64) -> f64 {
        raw.clamp(self.min_score, self.max_score)
    }

    /// Score a feature vector. Never fails.
    ///
    /// Validation, I/O and execution failures all yield the default score.
    pub fn score(&self, regressor: &dyn Regressor, features: &FeatureVector) -> Scored {
        match self.try_score(regressor, features) {
            Ok(score) => {
                debug!(model = %regressor.name(), score = score, "Model inference complete");
                Scored {
                    score,
                    outcome: PredictionOutcome::Success,
                    failure: None,
                }
            }
            Err(e) => {
                match &e {
                    InferenceError::Validation(_) => {
                        warn!(model = %regressor.name(), error = %e, "Prediction error - data validation failed")
                    }
                    InferenceError::Io { .. } => {
                        error!(model = %regressor.name(), error = %e, "Prediction error - file access failed")
                    }
                    InferenceError::Execution(_) => {
                        error!(model = %regressor.name(), error = %e, "Prediction error - model execution failed")
                    }
                }
                Scored {
                    score: self.default_score,
                    outcome: PredictionOutcome::Degraded,
                    failure: Some(e),
                }
            }
        }
    }

    fn try_score(
        &self,
        regressor: &dyn Regressor,
        features: &FeatureVector,
    ) -> Result<f64, InferenceError> {
        features.validate()?;

        // Infinite outputs clamp to the range bounds; only NaN has no score
        let raw = regressor.predict(features)?;
        if raw.is_nan() {
            return Err(InferenceError::Validation("model output is NaN".to_string()));
        }

        Ok(self.clamp(raw))
    }
}

impl Default for PredictionExecutor {
    fn default() -> Self {
        Self::new(&PredictionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Fixed(f64);

    impl Regressor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
            Ok(self.0)
        }
    }

    struct Failing(fn() -> InferenceError);

    impl Regressor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
            Err((self.0)())
        }
    }

    fn features() -> FeatureVector {
        FeatureVector {
            traffic_volume: 1500.0,
            average_speed: 25.0,
            capacity_utilization: 75.0,
            incident_reports: 2.0,
            pedestrian_cyclist_count: 50.0,
            area_code: 0,
            road_code: 0,
            weather_code: 0,
            roadwork_code: 0,
            day: 6,
            month: 1,
            is_weekend: true,
            speed_to_volume: 25.0 / 1501.0,
            incidents_per_capacity: 2.0 / 76.0,
        }
    }

    #[test]
    fn test_score_in_range() {
        let executor = PredictionExecutor::default();
        let scored = executor.score(&Fixed(63.2), &features());

        assert_eq!(scored.score, 63.2);
        assert_eq!(scored.outcome, PredictionOutcome::Success);
        assert!(scored.failure.is_none());
    }

    #[test]
    fn test_score_is_clamped() {
        let executor = PredictionExecutor::default();
        assert_eq!(executor.score(&Fixed(140.0), &features()).score, 100.0);
        assert_eq!(executor.score(&Fixed(-12.0), &features()).score, 0.0);
    }

    #[test]
    fn test_failures_yield_default_score() {
        let executor = PredictionExecutor::default();
        let failures: [fn() -> InferenceError; 3] = [
            || InferenceError::Validation("bad feature".to_string()),
            || InferenceError::Io {
                path: PathBuf::from("models/congestion_model.onnx"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
            || InferenceError::Execution("kernel panic".to_string()),
        ];

        for failure in failures {
            let scored = executor.score(&Failing(failure), &features());
            assert_eq!(scored.score, 50.0);
            assert_eq!(scored.outcome, PredictionOutcome::Degraded);
            assert!(scored.failure.is_some());
        }
    }

    #[test]
    fn test_nan_output_yields_default_score() {
        let executor = PredictionExecutor::default();
        let scored = executor.score(&Fixed(f64::NAN), &features());

        assert_eq!(scored.score, 50.0);
        assert!(matches!(scored.failure, Some(InferenceError::Validation(_))));
    }

    #[test]
    fn test_infinite_output_is_clamped() {
        let executor = PredictionExecutor::default();

        let high = executor.score(&Fixed(f64::INFINITY), &features());
        assert_eq!(high.score, 100.0);
        assert_eq!(high.outcome, PredictionOutcome::Success);

        let low = executor.score(&Fixed(f64::NEG_INFINITY), &features());
        assert_eq!(low.score, 0.0);
        assert_eq!(low.outcome, PredictionOutcome::Success);
    }

    #[test]
    fn test_invalid_range_falls_back_to_defaults() {
        let inverted = PredictionConfig {
            min_score: 100.0,
            max_score: 0.0,
            ..PredictionConfig::default()
        };
        let executor = PredictionExecutor::new(&inverted);
        assert_eq!(executor.score(&Fixed(140.0), &features()).score, 100.0);
        assert_eq!(executor.default_score(), 50.0);

        let nan_bound = PredictionConfig {
            max_score: f64::NAN,
            ..PredictionConfig::default()
        };
        let executor = PredictionExecutor::new(&nan_bound);
        assert_eq!(executor.score(&Fixed(-3.0), &features()).score, 0.0);
    }

    #[test]
    fn test_feature_beyond_f32_range_never_reaches_model() {
        let executor = PredictionExecutor::default();
        let mut huge = features();
        huge.traffic_volume = 1e39;

        let scored = executor.score(&Fixed(80.0), &huge);

        assert_eq!(scored.score, 50.0);
        assert!(matches!(scored.failure, Some(InferenceError::Validation(_))));
    }

    #[test]
    fn test_invalid_features_never_reach_model() {
        let executor = PredictionExecutor::default();
        let mut bad = features();
        bad.speed_to_volume = f64::INFINITY;

        let scored = executor.score(&Fixed(80.0), &bad);

        assert_eq!(scored.score, 50.0);
        assert_eq!(scored.outcome, PredictionOutcome::Degraded);
    }
}
