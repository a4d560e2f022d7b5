//! Per-area aggregation of historical signals

use crate::types::observation::{NumericSignal, Observation};
use serde::Serialize;
use std::path::PathBuf;

/// Where the historical observations came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    /// Loaded from a dataset file
    File(PathBuf),
    /// Generated because no usable dataset was available
    Synthetic,
}

/// How an imputed signal value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputedFrom {
    /// Mean of the matching observations
    HistoricalMean { samples: usize },
    /// Fixed default for the signal
    Default,
}

/// One imputed numeric signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Imputed {
    pub signal: NumericSignal,
    pub value: f64,
    pub from: ImputedFrom,
}

/// Aggregates historical observations into per-area signal means.
pub struct HistoricalAggregator {
    /// Observations, read-only for the lifetime of the invocation
    observations: Vec<Observation>,
    /// Origin of the observations
    source: HistorySource,
}

impl HistoricalAggregator {
    /// Create an aggregator over a set of observations.
    pub fn new(observations: Vec<Observation>, source: HistorySource) -> Self {
        Self {
            observations,
            source,
        }
    }

    /// Number of observations available.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether there are no observations at all.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Origin of the observations.
    pub fn source(&self) -> &HistorySource {
        &self.source
    }

    /// Observations recorded for an area (exact, case-sensitive match).
    pub fn matching<'a>(&'a self, area: &'a str) -> impl Iterator<Item = &'a Observation> + 'a {
        self.observations.iter().filter(move |obs| obs.area == area)
    }

    /// Whether any observation exists for an area.
    pub fn has_area(&self, area: &str) -> bool {
        self.matching(area).next().is_some()
    }

    /// Mean of a signal over an area's observations.
    ///
    /// Returns `None` when no observation matches, none of the matches record
    /// the signal, or the mean is not finite. Missing cells are skipped.
    pub fn area_mean(&self, area: &str, signal: NumericSignal) -> Option<(f64, usize)> {
        let (sum, count) = self
            .matching(area)
            .filter_map(|obs| obs.signal(signal))
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        if count == 0 {
            return None;
        }

        let mean = sum / count as f64;
        mean.is_finite().then_some((mean, count))
    }

    /// Resolve a signal for an area, substituting the fixed default when no
    /// historical mean is available.
    pub fn impute(&self, area: &str, signal: NumericSignal) -> Imputed {
        match self.area_mean(area, signal) {
            Some((value, samples)) => Imputed {
                signal,
                value,
                from: ImputedFrom::HistoricalMean { samples },
            },
            None => Imputed {
                signal,
                value: signal.default_value(),
                from: ImputedFrom::Default,
            },
        }
    }

    /// Resolve all five signals for an area, in feature-vector order.
    pub fn impute_all(&self, area: &str) -> [Imputed; 5] {
        NumericSignal::ALL.map(|signal| self.impute(area, signal))
    }
}
