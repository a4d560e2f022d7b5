//! Congestion Predictor Library
//!
//! Predicts a road congestion score (0-100) for an area, road, weather
//! condition and roadwork state using a trained regressor, imputing missing
//! signals from historical traffic data.

pub mod config;
pub mod encoding;
pub mod error;
pub mod feature_assembler;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod types;

pub use config::AppConfig;
pub use encoding::{CategoricalField, Encoder, EncoderSet};
pub use error::InferenceError;
pub use feature_assembler::{FeatureAssembler, FeatureVector};
pub use history::HistoricalAggregator;
pub use models::inference::{OnnxRegressor, PredictionExecutor, Regressor};
pub use pipeline::{Artifacts, CongestionPipeline};
pub use types::{PredictionReport, PredictionRequest};
