//! Feature assembly for congestion model inference.
//!
//! This module builds the feature vector that matches the features used
//! during model training: imputed numeric signals, encoded categoricals,
//! calendar attributes, and two derived ratios, in a fixed order.

use crate::encoding::{CategoricalField, EncoderSet, Resolution};
use crate::error::InferenceError;
use crate::history::{HistoricalAggregator, ImputedFrom};
use crate::types::report::Fallback;
use crate::types::request::PredictionRequest;
use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Number of features the model was trained on
pub const FEATURE_COUNT: usize = 14;

/// Feature names in training order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "traffic_volume",
    "average_speed",
    "capacity_utilization",
    "incident_reports",
    "pedestrian_cyclist_count",
    "area_code",
    "road_code",
    "weather_code",
    "roadwork_code",
    "day",
    "month",
    "is_weekend",
    "speed_to_volume",
    "incidents_per_capacity",
];

/// Date format accepted for prediction dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fully assembled model input.
///
/// Field order matches the trained model; changing it requires retraining.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub traffic_volume: f64,
    pub average_speed: f64,
    pub capacity_utilization: f64,
    pub incident_reports: f64,
    pub pedestrian_cyclist_count: f64,
    pub area_code: i64,
    pub road_code: i64,
    pub weather_code: i64,
    pub roadwork_code: i64,
    pub day: u32,
    pub month: u32,
    pub is_weekend: bool,
    pub speed_to_volume: f64,
    pub incidents_per_capacity: f64,
}

impl FeatureVector {
    /// Values in training order, widened to `f64`
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.traffic_volume,
            self.average_speed,
            self.capacity_utilization,
            self.incident_reports,
            self.pedestrian_cyclist_count,
            self.area_code as f64,
            self.road_code as f64,
            self.weather_code as f64,
            self.roadwork_code as f64,
            f64::from(self.day),
            f64::from(self.month),
            if self.is_weekend { 1.0 } else { 0.0 },
            self.speed_to_volume,
            self.incidents_per_capacity,
        ]
    }

    /// Model input row in training order
    pub fn to_row(&self) -> [f32; FEATURE_COUNT] {
        self.values().map(|v| v as f32)
    }

    /// Check every feature is finite in the `f32` row sent to the model.
    pub fn validate(&self) -> Result<(), InferenceError> {
        match self
            .values()
            .iter()
            .zip(FEATURE_NAMES)
            .find(|(v, _)| !(**v as f32).is_finite())
        {
            Some((v, name)) => Err(InferenceError::Validation(format!(
                "feature {} is not finite ({})",
                name, v
            ))),
            None => Ok(()),
        }
    }
}

/// `numerator / (denominator + 1)`, or 0.0 when the shifted denominator is
/// zero or the quotient is not finite.
pub fn offset_ratio(numerator: f64, denominator: f64) -> f64 {
    let shifted = denominator + 1.0;
    if shifted == 0.0 {
        return 0.0;
    }
    let ratio = numerator / shifted;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Source of the current date
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// How the prediction date was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSource {
    /// Caller-supplied date parsed successfully
    Supplied,
    /// Caller-supplied date could not be parsed; current date used
    Invalid(String),
    /// No date supplied; current date used
    Absent,
}

/// Resolve the prediction date, falling back to the clock's current date.
pub fn resolve_date(supplied: Option<&str>, clock: &dyn Clock) -> (NaiveDate, DateSource) {
    match supplied {
        Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(date) => {
                info!(date = %raw, "Using provided prediction date");
                (date, DateSource::Supplied)
            }
            Err(e) => {
                let today = clock.today();
                warn!(
                    supplied = %raw,
                    error = %e,
                    date = %today.format(DATE_FORMAT),
                    "Invalid date format, using current date"
                );
                (today, DateSource::Invalid(raw.to_string()))
            }
        },
        None => {
            let today = clock.today();
            info!(date = %today.format(DATE_FORMAT), "Using current date");
            (today, DateSource::Absent)
        }
    }
}

/// Whether a date falls on Saturday or Sunday
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Output of feature assembly
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Model input
    pub features: FeatureVector,
    /// Resolved prediction date
    pub date: NaiveDate,
    /// Substitutions made while assembling
    pub fallbacks: Vec<Fallback>,
}

/// Feature assembler that turns requests into model input features.
///
/// Features are assembled in the exact order expected by the trained model.
pub struct FeatureAssembler {
    clock: Box<dyn Clock>,
}

impl FeatureAssembler {
    /// Create an assembler that uses the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an assembler with an explicit clock.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Assemble features for a request.
    ///
    /// Numeric signals are imputed from history keyed by the raw area string,
    /// before encoding. Fails only when the assembled vector is not finite.
    pub fn assemble(
        &self,
        request: &PredictionRequest,
        encoders: &EncoderSet,
        history: &HistoricalAggregator,
    ) -> Result<Assembly, InferenceError> {
        let mut fallbacks = Vec::new();

        // Categorical codes (4)
        let codes = CategoricalField::ALL.map(|field| {
            let value = categorical_value(request, field);
            let encoded = encoders.encode(field, value);
            match encoded.resolution {
                Resolution::Known => {}
                Resolution::Unseen => fallbacks.push(Fallback::UnseenCategory {
                    field,
                    value: value.to_string(),
                    code: encoded.code,
                }),
                Resolution::EncoderMissing => fallbacks.push(Fallback::MissingEncoder { field }),
                Resolution::EncodingFailed(reason) => {
                    fallbacks.push(Fallback::EncodingFailed { field, reason })
                }
            }
            encoded.code
        });
        let [area_code, road_code, weather_code, roadwork_code] = codes;

        // Imputed numeric signals (5)
        if !history.has_area(&request.area) {
            warn!(
                area = %request.area,
                road = %request.road,
                "No historical data for area, using default signal values"
            );
            fallbacks.push(Fallback::NoHistoricalMatch {
                area: request.area.clone(),
            });
        }

        let imputed = history.impute_all(&request.area);
        for value in &imputed {
            if value.from == ImputedFrom::Default {
                fallbacks.push(Fallback::DefaultSignal {
                    signal: value.signal,
                    value: value.value,
                });
            }
        }
        let [traffic_volume, average_speed, capacity_utilization, incident_reports, pedestrian_cyclist_count] =
            imputed.map(|i| i.value);

        // Temporal features (3)
        let (date, source) = resolve_date(request.date.as_deref(), self.clock.as_ref());
        match source {
            DateSource::Supplied => {}
            DateSource::Invalid(raw) => fallbacks.push(Fallback::CurrentDate {
                supplied: Some(raw),
            }),
            DateSource::Absent => fallbacks.push(Fallback::CurrentDate { supplied: None }),
        }

        let features = FeatureVector {
            traffic_volume,
            average_speed,
            capacity_utilization,
            incident_reports,
            pedestrian_cyclist_count,
            area_code,
            road_code,
            weather_code,
            roadwork_code,
            day: date.day(),
            month: date.month(),
            is_weekend: is_weekend(date),
            // Derived ratios (2)
            speed_to_volume: offset_ratio(average_speed, traffic_volume),
            incidents_per_capacity: offset_ratio(incident_reports, capacity_utilization),
        };

        debug!(
            day = features.day,
            month = features.month,
            is_weekend = features.is_weekend,
            "Temporal features"
        );

        features.validate()?;

        Ok(Assembly {
            features,
            date,
            fallbacks,
        })
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn categorical_value(request: &PredictionRequest, field: CategoricalField) -> &str {
    match field {
        CategoricalField::Area => &request.area,
        CategoricalField::Road => &request.road,
        CategoricalField::Weather => &request.weather,
        CategoricalField::Roadwork => &request.roadwork_activity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoder;
    use crate::history::HistorySource;
    use crate::types::observation::{NumericSignal, Observation};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn encoders() -> EncoderSet {
        EncoderSet::new()
            .with(
                CategoricalField::Area,
                Encoder::new(["Indiranagar", "Koramangala", "Whitefield"]),
            )
            .with(
                CategoricalField::Road,
                Encoder::new(["100 Feet Road", "5th Block", "ITPL Main Road"]),
            )
            .with(CategoricalField::Weather, Encoder::new(["Clear", "Fog", "Rain"]))
            .with(CategoricalField::Roadwork, Encoder::new(["No", "Yes"]))
    }

    fn history() -> HistoricalAggregator {
        HistoricalAggregator::new(
            vec![
                Observation::new("Koramangala", "5th Block", [1999.0, 20.0, 79.0, 4.0, 60.0]),
                Observation::new("Koramangala", "5th Block", [1999.0, 20.0, 79.0, 4.0, 60.0]),
            ],
            HistorySource::Synthetic,
        )
    }

    fn assembler() -> FeatureAssembler {
        FeatureAssembler::with_clock(FixedClock(date("2024-03-15")))
    }

    #[test]
    fn test_feature_assembly() {
        let request =
            PredictionRequest::new("Koramangala", "5th Block", "Rain", "Yes").with_date("2024-01-06");

        let assembly = assembler()
            .assemble(&request, &encoders(), &history())
            .unwrap();
        let f = &assembly.features;

        assert_eq!(f.traffic_volume, 1999.0);
        assert_eq!(f.average_speed, 20.0);
        assert_eq!(f.area_code, 1);
        assert_eq!(f.road_code, 1);
        assert_eq!(f.weather_code, 2);
        assert_eq!(f.roadwork_code, 1);
        assert_eq!((f.day, f.month, f.is_weekend), (6, 1, true));
        assert!((f.speed_to_volume - 0.01).abs() < 1e-12);
        assert!((f.incidents_per_capacity - 0.05).abs() < 1e-12);
        assert!(assembly.fallbacks.is_empty());
    }

    #[test]
    fn test_row_order() {
        let request =
            PredictionRequest::new("Koramangala", "5th Block", "Rain", "Yes").with_date("2024-01-08");

        let row = assembler()
            .assemble(&request, &encoders(), &history())
            .unwrap()
            .features
            .to_row();

        assert_eq!(row.len(), FEATURE_COUNT);
        assert_eq!(row[0], 1999.0);
        assert_eq!(row[4], 60.0);
        assert_eq!(row[5], 1.0);
        assert_eq!(row[8], 1.0);
        assert_eq!(row[9], 8.0);
        assert_eq!(row[10], 1.0);
        assert_eq!(row[11], 0.0);
    }

    #[test]
    fn test_unknown_area_uses_defaults_and_fallback_code() {
        let request = PredictionRequest::new("Atlantis", "5th Block", "Clear", "No").with_date("2024-01-08");

        let assembly = assembler()
            .assemble(&request, &encoders(), &history())
            .unwrap();
        let f = &assembly.features;

        assert_eq!(
            [
                f.traffic_volume,
                f.average_speed,
                f.capacity_utilization,
                f.incident_reports,
                f.pedestrian_cyclist_count
            ],
            [1500.0, 25.0, 75.0, 2.0, 50.0]
        );
        assert_eq!(f.area_code, 0);
        assert!(assembly
            .fallbacks
            .contains(&Fallback::NoHistoricalMatch { area: "Atlantis".to_string() }));
        assert!(assembly.fallbacks.iter().any(|fb| matches!(
            fb,
            Fallback::UnseenCategory { field: CategoricalField::Area, .. }
        )));
    }

    #[test]
    fn test_offset_ratio_is_always_finite() {
        assert_eq!(offset_ratio(25.0, -1.0), 0.0);
        assert_eq!(offset_ratio(2.0, -1.0), 0.0);
        assert!((offset_ratio(25.0, 1499.0) - 25.0 / 1500.0).abs() < 1e-12);
        assert_eq!(offset_ratio(f64::MAX, -0.5), 0.0);
        assert!(offset_ratio(-3.0, -2.0).is_finite());
    }

    #[test]
    fn test_offset_applied_before_division() {
        // 10 / (4 + 1), not 10 / 4 + 1
        assert_eq!(offset_ratio(10.0, 4.0), 2.0);
    }

    #[test]
    fn test_weekend_detection() {
        assert!(is_weekend(date("2024-01-06")));
        assert!(is_weekend(date("2024-01-07")));
        assert!(!is_weekend(date("2024-01-08")));
    }

    #[test]
    fn test_invalid_date_uses_clock() {
        let clock = FixedClock(date("2024-03-16"));
        let (resolved, source) = resolve_date(Some("not-a-date"), &clock);

        assert_eq!(resolved, date("2024-03-16"));
        assert_eq!(source, DateSource::Invalid("not-a-date".to_string()));
    }

    #[test]
    fn test_absent_date_uses_clock() {
        let request = PredictionRequest::new("Koramangala", "5th Block", "Rain", "Yes");

        let assembly = assembler()
            .assemble(&request, &encoders(), &history())
            .unwrap();

        assert_eq!(assembly.date, date("2024-03-15"));
        assert_eq!((assembly.features.day, assembly.features.month), (15, 3));
        assert!(!assembly.features.is_weekend);
        assert!(assembly
            .fallbacks
            .contains(&Fallback::CurrentDate { supplied: None }));
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_NAMES[12], "speed_to_volume");
        for (i, signal) in NumericSignal::ALL.iter().enumerate() {
            assert_eq!(FEATURE_NAMES[i], signal.name());
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut features = assembler()
            .assemble(
                &PredictionRequest::new("Koramangala", "5th Block", "Rain", "Yes"),
                &encoders(),
                &history(),
            )
            .unwrap()
            .features;
        features.average_speed = f64::NAN;

        assert!(matches!(
            features.validate(),
            Err(InferenceError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_checks_model_precision() {
        let mut features = assembler()
            .assemble(
                &PredictionRequest::new("Koramangala", "5th Block", "Rain", "Yes"),
                &encoders(),
                &history(),
            )
            .unwrap()
            .features;
        features.traffic_volume = 1e39;

        assert!(features.traffic_volume.is_finite());
        assert!(matches!(
            features.validate(),
            Err(InferenceError::Validation(msg)) if msg.contains("traffic_volume")
        ));
    }
}
