//! Prediction pipeline orchestration.
//!
//! Loads the trained artifacts and historical data once, then sequences
//! feature assembly and inference for a request. Artifact loading is the only
//! step that can fail; every later failure degrades the prediction to the
//! default score instead of propagating.

use crate::config::{AppConfig, ArtifactsConfig, PredictionConfig};
use crate::encoding::EncoderSet;
use crate::feature_assembler::{Clock, FeatureAssembler};
use crate::history::{HistoricalAggregator, HistoryLoader, HistorySource};
use crate::metrics::{PipelineMetrics, Stage};
use crate::models::inference::{OnnxRegressor, PredictionExecutor, Regressor};
use crate::types::report::{Fallback, PredictionOutcome, PredictionReport, SeverityThresholds};
use crate::types::request::PredictionRequest;
use anyhow::Result;
use tracing::{info, info_span, warn};

/// Trained model and encoders, loaded once per invocation.
pub struct Artifacts {
    pub regressor: Box<dyn Regressor>,
    pub encoders: EncoderSet,
}

impl Artifacts {
    /// Wrap already loaded artifacts
    pub fn new(regressor: impl Regressor + 'static, encoders: EncoderSet) -> Self {
        Self {
            regressor: Box::new(regressor),
            encoders,
        }
    }

    /// Load the ONNX regressor and JSON encoders.
    ///
    /// Failure here is fatal to the invocation.
    pub fn load(config: &ArtifactsConfig) -> Result<Self> {
        let regressor = OnnxRegressor::load(&config.model_path, config.onnx_threads)?;
        let encoders = EncoderSet::load(&config.encoders_path)?;
        Ok(Self::new(regressor, encoders))
    }
}

/// Congestion prediction pipeline
pub struct CongestionPipeline {
    artifacts: Artifacts,
    history: HistoricalAggregator,
    assembler: FeatureAssembler,
    executor: PredictionExecutor,
    thresholds: SeverityThresholds,
}

impl CongestionPipeline {
    /// Create a pipeline from loaded artifacts and history
    pub fn new(
        artifacts: Artifacts,
        history: HistoricalAggregator,
        prediction: &PredictionConfig,
    ) -> Self {
        Self {
            artifacts,
            history,
            assembler: FeatureAssembler::new(),
            executor: PredictionExecutor::new(prediction),
            thresholds: prediction.severity.clone(),
        }
    }

    /// Use an explicit clock for date resolution
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.assembler = FeatureAssembler::with_clock(clock);
        self
    }

    /// Load artifacts and history as configured.
    ///
    /// Returns an error only if the model or encoders cannot be loaded.
    pub fn from_config(config: &AppConfig, metrics: &mut PipelineMetrics) -> Result<Self> {
        let artifacts = metrics.time(Stage::LoadArtifacts, || Artifacts::load(&config.artifacts))?;

        let history = metrics.time(Stage::LoadHistory, || {
            HistoryLoader::new(&config.history).load_or_synthesize()
        });

        info!(
            encoders = artifacts.encoders.len(),
            model = %artifacts.regressor.name(),
            history_records = history.len(),
            "Pipeline initialized"
        );

        Ok(Self::new(artifacts, history, &config.prediction))
    }

    /// Historical data in use
    pub fn history(&self) -> &HistoricalAggregator {
        &self.history
    }

    /// Predict congestion for a request. Never fails.
    pub fn predict(&self, request: &PredictionRequest) -> PredictionReport {
        self.predict_with_metrics(request, &mut PipelineMetrics::new())
    }

    /// Predict congestion, recording stage timings and fallbacks.
    pub fn predict_with_metrics(
        &self,
        request: &PredictionRequest,
        metrics: &mut PipelineMetrics,
    ) -> PredictionReport {
        let span = info_span!("predict", request_id = %request.request_id);
        let _enter = span.enter();

        info!(
            area = %request.area,
            road = %request.road,
            weather = %request.weather,
            roadwork = %request.roadwork_activity,
            date = ?request.date,
            "Predicting congestion"
        );

        let mut fallbacks = Vec::new();
        if *self.history.source() == HistorySource::Synthetic {
            fallbacks.push(Fallback::SyntheticHistory);
        }

        let assembled = metrics.time(Stage::Assemble, || {
            self.assembler
                .assemble(request, &self.artifacts.encoders, &self.history)
        });

        let report = match assembled {
            Ok(assembly) => {
                fallbacks.extend(assembly.fallbacks);

                let scored = metrics.time(Stage::Infer, || {
                    self.executor
                        .score(self.artifacts.regressor.as_ref(), &assembly.features)
                });
                if let Some(failure) = &scored.failure {
                    fallbacks.push(Fallback::DefaultScore {
                        reason: failure.to_string(),
                    });
                }

                self.report(request, scored.score, scored.outcome)
                    .with_features(assembly.features, assembly.date)
            }
            Err(e) => {
                warn!(error = %e, "Feature assembly failed, using default score");
                fallbacks.push(Fallback::DefaultScore {
                    reason: e.to_string(),
                });
                self.report(
                    request,
                    self.executor.default_score(),
                    PredictionOutcome::Degraded,
                )
            }
        };

        metrics.record_fallbacks(&fallbacks);
        metrics.record_outcome(report.outcome, report.score);

        info!(
            score = report.score,
            outcome = ?report.outcome,
            severity = ?report.severity,
            estimated_delay = %report.estimated_delay,
            fallbacks = fallbacks.len(),
            "Prediction complete"
        );

        report.with_fallbacks(fallbacks)
    }

    fn report(
        &self,
        request: &PredictionRequest,
        score: f64,
        outcome: PredictionOutcome,
    ) -> PredictionReport {
        PredictionReport::new(
            request.request_id.clone(),
            score,
            outcome,
            &self.thresholds,
            self.history.source().clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{CategoricalField, Encoder};
    use crate::error::InferenceError;
    use crate::feature_assembler::{FeatureVector, FixedClock};
    use crate::types::observation::Observation;
    use chrono::NaiveDate;

    struct SpeedModel;

    impl Regressor for SpeedModel {
        fn name(&self) -> &str {
            "speed"
        }

        fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
            Ok(100.0 - features.average_speed)
        }
    }

    fn pipeline() -> CongestionPipeline {
        let encoders = EncoderSet::new()
            .with(CategoricalField::Area, Encoder::new(["Indiranagar", "Koramangala"]))
            .with(CategoricalField::Road, Encoder::new(["100 Feet Road", "5th Block"]))
            .with(CategoricalField::Weather, Encoder::new(["Clear", "Rain"]))
            .with(CategoricalField::Roadwork, Encoder::new(["No", "Yes"]));
        let history = HistoricalAggregator::new(
            vec![Observation::new("Indiranagar", "100 Feet Road", [1800.0, 18.0, 90.0, 3.0, 70.0])],
            HistorySource::File("traffic.csv".into()),
        );

        CongestionPipeline::new(
            Artifacts::new(SpeedModel, encoders),
            history,
            &PredictionConfig::default(),
        )
        .with_clock(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()))
    }

    #[test]
    fn test_successful_prediction() {
        let request = PredictionRequest::new("Indiranagar", "100 Feet Road", "Rain", "Yes")
            .with_date("2024-01-06");
        let mut metrics = PipelineMetrics::new();

        let report = pipeline().predict_with_metrics(&request, &mut metrics);

        assert_eq!(report.score, 82.0);
        assert_eq!(report.outcome, PredictionOutcome::Success);
        assert_eq!(report.prediction_date, NaiveDate::from_ymd_opt(2024, 1, 6));
        assert!(report.fallbacks.is_empty());
        assert!(report.features.as_ref().unwrap().is_weekend);
        assert_eq!(metrics.outcome(), Some((PredictionOutcome::Success, 82.0)));
        assert!(metrics.stage_time(Stage::Infer).is_some());
    }

    #[test]
    fn test_fallbacks_are_reported() {
        let request = PredictionRequest::new("Hebbal", "100 Feet Road", "Hail", "No")
            .with_date("06/01/2024");

        let report = pipeline().predict(&request);

        // Defaults: 100 - 25
        assert_eq!(report.score, 75.0);
        assert_eq!(report.outcome, PredictionOutcome::Success);
        assert_eq!(report.prediction_date, NaiveDate::from_ymd_opt(2024, 1, 8));

        let labels: Vec<&str> = report.fallbacks.iter().map(|f| f.label()).collect();
        assert!(labels.contains(&"unseen_category"));
        assert!(labels.contains(&"no_historical_match"));
        assert!(labels.contains(&"default_signal"));
        assert!(labels.contains(&"current_date"));
    }
}
