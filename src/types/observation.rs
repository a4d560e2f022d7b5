//! Historical traffic observations used for numeric imputation

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One historical traffic record for an area/road pair.
///
/// Column names follow the training dataset; snake_case headers are accepted
/// too. Numeric cells may be empty or hold a missing-value marker such as
/// `NA` or `null`, in which case they do not contribute to any aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Area (neighbourhood) name
    #[serde(alias = "Area Name")]
    pub area: String,

    /// Road or intersection name
    #[serde(alias = "Road/Intersection Name", default)]
    pub road: String,

    /// Vehicles observed in the sampling window
    #[serde(alias = "Traffic Volume", default, deserialize_with = "missing_as_none")]
    pub traffic_volume: Option<f64>,

    /// Average vehicle speed (km/h)
    #[serde(alias = "Average Speed", default, deserialize_with = "missing_as_none")]
    pub average_speed: Option<f64>,

    /// Road capacity utilization (percent)
    #[serde(alias = "Road Capacity Utilization", default, deserialize_with = "missing_as_none")]
    pub capacity_utilization: Option<f64>,

    /// Number of reported incidents
    #[serde(alias = "Incident Reports", default, deserialize_with = "missing_as_none")]
    pub incident_reports: Option<f64>,

    /// Pedestrians and cyclists observed
    #[serde(alias = "Pedestrian and Cyclist Count", default, deserialize_with = "missing_as_none")]
    pub pedestrian_cyclist_count: Option<f64>,
}

impl Observation {
    /// Create an observation with every numeric signal present
    pub fn new(area: &str, road: &str, signals: [f64; 5]) -> Self {
        let [traffic_volume, average_speed, capacity_utilization, incident_reports, pedestrians] =
            signals;
        Self {
            area: area.to_string(),
            road: road.to_string(),
            traffic_volume: Some(traffic_volume),
            average_speed: Some(average_speed),
            capacity_utilization: Some(capacity_utilization),
            incident_reports: Some(incident_reports),
            pedestrian_cyclist_count: Some(pedestrians),
        }
    }

    /// Value of one numeric signal, if recorded
    pub fn signal(&self, signal: NumericSignal) -> Option<f64> {
        match signal {
            NumericSignal::TrafficVolume => self.traffic_volume,
            NumericSignal::AverageSpeed => self.average_speed,
            NumericSignal::CapacityUtilization => self.capacity_utilization,
            NumericSignal::IncidentReports => self.incident_reports,
            NumericSignal::PedestrianCyclistCount => self.pedestrian_cyclist_count,
        }
    }
}

/// Cell markers read as a missing value
const MISSING_MARKERS: [&str; 12] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
];

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Number(f64),
    Text(String),
}

fn missing_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Cell>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Cell::Number(v)) if v.is_nan() => Ok(None),
        Some(Cell::Number(v)) => Ok(Some(v)),
        Some(Cell::Text(text)) => {
            let text = text.trim();
            if MISSING_MARKERS.contains(&text) {
                return Ok(None);
            }
            text.parse::<f64>()
                .map(|v| if v.is_nan() { None } else { Some(v) })
                .map_err(|_| serde::de::Error::custom(format!("invalid number {:?}", text)))
        }
    }
}

/// The five numeric signals imputed from historical data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericSignal {
    TrafficVolume,
    AverageSpeed,
    CapacityUtilization,
    IncidentReports,
    PedestrianCyclistCount,
}

impl NumericSignal {
    /// All signals, in feature-vector order
    pub const ALL: [NumericSignal; 5] = [
        NumericSignal::TrafficVolume,
        NumericSignal::AverageSpeed,
        NumericSignal::CapacityUtilization,
        NumericSignal::IncidentReports,
        NumericSignal::PedestrianCyclistCount,
    ];

    /// Fixed value used when no historical mean is available
    pub fn default_value(self) -> f64 {
        match self {
            NumericSignal::TrafficVolume => 1500.0,
            NumericSignal::AverageSpeed => 25.0,
            NumericSignal::CapacityUtilization => 75.0,
            NumericSignal::IncidentReports => 2.0,
            NumericSignal::PedestrianCyclistCount => 50.0,
        }
    }

    /// Feature name used in the feature vector
    pub fn name(self) -> &'static str {
        match self {
            NumericSignal::TrafficVolume => "traffic_volume",
            NumericSignal::AverageSpeed => "average_speed",
            NumericSignal::CapacityUtilization => "capacity_utilization",
            NumericSignal::IncidentReports => "incident_reports",
            NumericSignal::PedestrianCyclistCount => "pedestrian_cyclist_count",
        }
    }
}

impl fmt::Display for NumericSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
