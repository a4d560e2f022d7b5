//! Configuration management for the congestion predictor

use crate::history::synthetic::DEFAULT_SYNTHETIC_ROWS;
use crate::types::report::SeverityThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "CONGESTION_CONFIG";

/// Output format for the prediction result on stdout
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The bare numeric score
    #[default]
    Plain,
    /// The full prediction report as JSON
    Json,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub history: HistoryConfig,
    pub prediction: PredictionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Trained model and encoder artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// ONNX regressor file
    pub model_path: String,
    /// JSON encoder vocabulary file
    pub encoders_path: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: "models/congestion_model.onnx".to_string(),
            encoders_path: "models/encoders.json".to_string(),
            onnx_threads: 1,
        }
    }
}

/// Historical dataset used for imputation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Candidate CSV paths, tried in order
    pub data_paths: Vec<String>,
    /// Seed for synthetic data when no dataset is available
    pub synthetic_seed: u64,
    /// Number of synthetic observations
    pub synthetic_rows: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            data_paths: vec![
                "data/Bangalore_Traffic_Pulse.csv".to_string(),
                "Bangalore_Traffic_Pulse.csv".to_string(),
            ],
            synthetic_seed: 42,
            synthetic_rows: DEFAULT_SYNTHETIC_ROWS,
        }
    }
}

/// Score bounds and fallback
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Score returned when a prediction degrades
    pub default_score: f64,
    /// Lower clamp bound
    pub min_score: f64,
    /// Upper clamp bound
    pub max_score: f64,
    /// Severity band thresholds
    pub severity: SeverityThresholds,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            default_score: 50.0,
            min_score: 0.0,
            max_score: 100.0,
            severity: SeverityThresholds::default(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// "plain" or "json"
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location.
    ///
    /// The file is optional; `CONGESTION__SECTION__KEY` environment variables
    /// override file values, and built-in defaults fill the rest.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("CONGESTION").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a valid score
    pub fn validate(&self) -> Result<()> {
        self.prediction.validate()
    }
}

impl PredictionConfig {
    /// Check the score range is ordered and contains the default score
    pub fn validate(&self) -> Result<()> {
        if !(self.min_score <= self.max_score) {
            anyhow::bail!(
                "prediction.min_score ({}) must not exceed prediction.max_score ({})",
                self.min_score,
                self.max_score
            );
        }
        if !(self.min_score..=self.max_score).contains(&self.default_score) {
            anyhow::bail!(
                "prediction.default_score ({}) must lie within [{}, {}]",
                self.default_score,
                self.min_score,
                self.max_score
            );
        }
        Ok(())
    }
}
