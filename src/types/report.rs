//! Prediction report data structures

use crate::encoding::CategoricalField;
use crate::feature_assembler::FeatureVector;
use crate::history::HistorySource;
use crate::types::observation::NumericSignal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Congestion severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    Medium,
    High,
}

impl Severity {
    /// Determine severity from score and thresholds
    pub fn from_score(score: f64, thresholds: &SeverityThresholds) -> Self {
        if score >= thresholds.high {
            Severity::High
        } else if score >= thresholds.medium {
            Severity::Medium
        } else if score >= thresholds.moderate {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }

    /// Typical extra travel time for the band
    pub fn estimated_delay(self) -> &'static str {
        match self {
            Severity::Low => "0-3 minutes",
            Severity::Moderate => "3-8 minutes",
            Severity::Medium => "8-15 minutes",
            Severity::High => "15-25 minutes",
        }
    }
}

/// Configurable severity thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub moderate: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            moderate: 40.0,
            medium: 60.0,
            high: 80.0,
        }
    }
}

/// Multiplier applied to a free-flow travel time at a given score.
///
/// Piecewise linear: up to 1.15x at 25, 1.35x at 50, 1.7x at 75 and
/// 2.5x at 100.
pub fn travel_time_multiplier(score: f64) -> f64 {
    let s = score.clamp(0.0, 100.0);
    if s <= 25.0 {
        1.0 + s / 100.0 * 0.6
    } else if s <= 50.0 {
        1.15 + (s - 25.0) / 100.0 * 0.8
    } else if s <= 75.0 {
        1.35 + (s - 50.0) / 100.0 * 1.4
    } else {
        1.7 + (s - 75.0) / 100.0 * 3.2
    }
}

/// Terminal state of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionOutcome {
    /// Score computed by the model
    Success,
    /// Default score returned after a failure
    Degraded,
}

/// A substitution made while producing a prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fallback {
    /// Historical data was generated rather than loaded
    SyntheticHistory,
    /// Category not in the trained vocabulary
    UnseenCategory {
        field: CategoricalField,
        value: String,
        code: i64,
    },
    /// No encoder for the field
    MissingEncoder { field: CategoricalField },
    /// Encoder failed on the value
    EncodingFailed {
        field: CategoricalField,
        reason: String,
    },
    /// No historical observations for the area
    NoHistoricalMatch { area: String },
    /// Signal imputed with its fixed default
    DefaultSignal { signal: NumericSignal, value: f64 },
    /// Current date used instead of the supplied one
    CurrentDate { supplied: Option<String> },
    /// Model score replaced by the default score
    DefaultScore { reason: String },
}

impl Fallback {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Fallback::SyntheticHistory => "synthetic_history",
            Fallback::UnseenCategory { .. } => "unseen_category",
            Fallback::MissingEncoder { .. } => "missing_encoder",
            Fallback::EncodingFailed { .. } => "encoding_failed",
            Fallback::NoHistoricalMatch { .. } => "no_historical_match",
            Fallback::DefaultSignal { .. } => "default_signal",
            Fallback::CurrentDate { .. } => "current_date",
            Fallback::DefaultScore { .. } => "default_score",
        }
    }
}

/// Full result of one prediction invocation
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    /// Request identifier
    pub request_id: String,

    /// Congestion score in [0, 100]
    pub score: f64,

    /// Whether the score came from the model
    pub outcome: PredictionOutcome,

    /// Severity band for the score
    pub severity: Severity,

    /// Typical extra travel time
    pub estimated_delay: String,

    /// Travel time multiplier for the score
    pub travel_time_multiplier: f64,

    /// Date the prediction applies to, once resolved
    pub prediction_date: Option<NaiveDate>,

    /// Origin of the imputation data
    pub history_source: HistorySource,

    /// Assembled features, when assembly succeeded
    pub features: Option<FeatureVector>,

    /// Substitutions made along the way
    pub fallbacks: Vec<Fallback>,

    /// Report generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionReport {
    /// Create a report for a score
    pub fn new(
        request_id: String,
        score: f64,
        outcome: PredictionOutcome,
        thresholds: &SeverityThresholds,
        history_source: HistorySource,
    ) -> Self {
        let severity = Severity::from_score(score, thresholds);
        Self {
            request_id,
            score,
            outcome,
            severity,
            estimated_delay: severity.estimated_delay().to_string(),
            travel_time_multiplier: travel_time_multiplier(score),
            prediction_date: None,
            history_source,
            features: None,
            fallbacks: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the assembled features and resolved date
    pub fn with_features(mut self, features: FeatureVector, date: NaiveDate) -> Self {
        self.features = Some(features);
        self.prediction_date = Some(date);
        self
    }

    /// Attach the substitutions made
    pub fn with_fallbacks(mut self, fallbacks: Vec<Fallback>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Whether the score is the default after a failure
    pub fn is_degraded(&self) -> bool {
        self.outcome == PredictionOutcome::Degraded
    }
}
