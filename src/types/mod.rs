//! Type definitions for the congestion predictor

pub mod observation;
pub mod report;
pub mod request;

pub use observation::{NumericSignal, Observation};
pub use report::{Fallback, PredictionOutcome, PredictionReport, Severity};
pub use request::PredictionRequest;
