//! Prediction request supplied by the caller

use serde::{Deserialize, Serialize};

/// A single congestion prediction request.
///
/// All categorical inputs are kept as raw strings; encoding and date
/// resolution happen during feature assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Unique identifier for correlating diagnostics of one invocation
    #[serde(default = "new_request_id")]
    pub request_id: String,

    /// Area (neighbourhood) name
    pub area: String,

    /// Road or intersection name
    pub road: String,

    /// Weather conditions (e.g. "Clear", "Rain")
    pub weather: String,

    /// Roadwork and construction activity ("Yes" / "No")
    pub roadwork_activity: String,

    /// Requested prediction date (`YYYY-MM-DD`); current date when absent
    #[serde(default)]
    pub date: Option<String>,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl PredictionRequest {
    /// Create a request for the current date
    pub fn new(area: &str, road: &str, weather: &str, roadwork_activity: &str) -> Self {
        Self {
            request_id: new_request_id(),
            area: area.to_string(),
            road: road.to_string(),
            weather: weather.to_string(),
            roadwork_activity: roadwork_activity.to_string(),
            date: None,
        }
    }

    /// Set the requested prediction date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Build a request from positional invocation arguments:
    /// `<area> <road> <weather> <roadwork> [date]`.
    ///
    /// Returns `None` when the argument count is outside 4..=5.
    pub fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [area, road, weather, roadwork] => Some(Self::new(area, road, weather, roadwork)),
            [area, road, weather, roadwork, date] => {
                Some(Self::new(area, road, weather, roadwork).with_date(date.as_str()))
            }
            _ => None,
        }
    }
}
