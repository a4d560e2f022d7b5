//! Categorical encoding for model inference.
//!
//! Maps raw category strings to the integer codes the trained regressor
//! expects. Values outside the trained vocabulary never abort a prediction:
//! they resolve to the encoder's fallback code, and a missing or broken
//! encoder resolves to code 0.

use crate::error::EncodingError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Categorical inputs of a prediction request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Area,
    Road,
    Weather,
    Roadwork,
}

impl CategoricalField {
    /// All fields, in feature-vector order
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::Area,
        CategoricalField::Road,
        CategoricalField::Weather,
        CategoricalField::Roadwork,
    ];

    /// Short key used in encoder artifacts
    pub fn key(self) -> &'static str {
        match self {
            CategoricalField::Area => "area",
            CategoricalField::Road => "road",
            CategoricalField::Weather => "weather",
            CategoricalField::Roadwork => "roadwork",
        }
    }

    /// Column name used by the training dataset
    pub fn training_column(self) -> &'static str {
        match self {
            CategoricalField::Area => "Area Name",
            CategoricalField::Road => "Road/Intersection Name",
            CategoricalField::Weather => "Weather Conditions",
            CategoricalField::Roadwork => "Roadwork and Construction Activity",
        }
    }

    /// Resolve an artifact key (short key or training column name)
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.key() == key || f.training_column() == key)
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Trained vocabulary for one categorical field.
///
/// The code of a class is its position in `classes`, matching the order the
/// encoder was fitted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    classes: Vec<String>,
    /// Reserved code for unseen values; first class's code when absent
    #[serde(default)]
    unknown_code: Option<i64>,
}

impl Encoder {
    /// Create an encoder from classes in trained order
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            unknown_code: None,
        }
    }

    /// Use an explicit reserved code for unseen values
    pub fn with_unknown_code(mut self, code: i64) -> Self {
        self.unknown_code = Some(code);
        self
    }

    /// Trained classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Class that unseen values are treated as, if the encoder uses the
    /// first-class fallback
    pub fn fallback_class(&self) -> Option<&str> {
        match self.unknown_code {
            Some(_) => None,
            None => self.classes.first().map(String::as_str),
        }
    }

    /// Code assigned to values outside the vocabulary
    pub fn fallback_code(&self) -> Result<i64, EncodingError> {
        if let Some(code) = self.unknown_code {
            return Ok(code);
        }
        if self.classes.is_empty() {
            return Err(EncodingError::EmptyVocabulary);
        }
        position_code(0)
    }

    /// Code of a trained class, if the value is in the vocabulary
    pub fn code_of(&self, value: &str) -> Option<Result<i64, EncodingError>> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(position_code)
    }

    /// Encode a raw value, applying the unseen-value fallback
    pub fn encode(&self, value: &str) -> Result<Encoded, EncodingError> {
        match self.code_of(value) {
            Some(code) => Ok(Encoded {
                code: code?,
                resolution: Resolution::Known,
            }),
            None => Ok(Encoded {
                code: self.fallback_code()?,
                resolution: Resolution::Unseen,
            }),
        }
    }
}

fn position_code(position: usize) -> Result<i64, EncodingError> {
    i64::try_from(position).map_err(|_| EncodingError::CodeOutOfRange { position })
}

/// How a categorical value was resolved to its code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Value is in the trained vocabulary
    Known,
    /// Value was not trained; fallback code used
    Unseen,
    /// No encoder exists for the field; code 0 used
    EncoderMissing,
    /// Encoding failed; code 0 used
    EncodingFailed(String),
}

/// Result of encoding one categorical value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub code: i64,
    pub resolution: Resolution,
}

impl Encoded {
    /// Whether a substitute code was used
    pub fn is_fallback(&self) -> bool {
        self.resolution != Resolution::Known
    }
}

/// Encoders for every categorical field, loaded once per invocation.
#[derive(Debug, Clone, Default)]
pub struct EncoderSet {
    encoders: HashMap<CategoricalField, Encoder>,
}

impl EncoderSet {
    /// Create an empty encoder set
    pub fn new() -> Self {
        Self::default()
    }

    /// Load encoders from a JSON artifact.
    ///
    /// The artifact maps field keys (`area`, `road`, ... or the training column
    /// names) to `{ "classes": [...], "unknown_code": n }`. Unrecognized keys
    /// are skipped. A missing or unreadable file is a load-time failure.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        info!(path = %path.display(), "Loading categorical encoders");

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Encoders file not found: {}", path.display()))?;
        let parsed: HashMap<String, Encoder> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse encoders from {}", path.display()))?;

        let mut set = Self::new();
        for (key, encoder) in parsed {
            match CategoricalField::from_key(&key) {
                Some(field) => {
                    debug!(field = %field, classes = encoder.classes.len(), "Encoder loaded");
                    set.insert(field, encoder);
                }
                None => warn!(key = %key, "Ignoring encoder for unknown field"),
            }
        }

        if set.is_empty() {
            warn!(path = %path.display(), "No usable encoders, every field will encode as 0");
        } else {
            info!(count = set.len(), "Categorical encoders loaded");
        }

        Ok(set)
    }

    /// Register the encoder for a field
    pub fn insert(&mut self, field: CategoricalField, encoder: Encoder) {
        self.encoders.insert(field, encoder);
    }

    /// Builder-style variant of [`EncoderSet::insert`]
    pub fn with(mut self, field: CategoricalField, encoder: Encoder) -> Self {
        self.insert(field, encoder);
        self
    }

    /// Encoder for a field, if loaded
    pub fn get(&self, field: CategoricalField) -> Option<&Encoder> {
        self.encoders.get(&field)
    }

    /// Number of loaded encoders
    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    /// Whether no encoders are loaded
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Encode a value for a field. Never fails.
    pub fn encode(&self, field: CategoricalField, value: &str) -> Encoded {
        let Some(encoder) = self.get(field) else {
            warn!(field = %field, "No encoder for field, using code 0");
            return Encoded {
                code: 0,
                resolution: Resolution::EncoderMissing,
            };
        };

        match encoder.encode(value) {
            Ok(encoded) => {
                if encoded.resolution == Resolution::Unseen {
                    warn!(
                        field = %field,
                        value = %value,
                        fallback_code = encoded.code,
                        "Unseen category, using fallback code"
                    );
                }
                encoded
            }
            Err(e) => {
                warn!(field = %field, value = %value, error = %e, "Encoding error, using code 0");
                Encoded {
                    code: 0,
                    resolution: Resolution::EncodingFailed(e.to_string()),
                }
            }
        }
    }
}
