//! Historical dataset loader

use crate::config::HistoryConfig;
use crate::history::aggregator::{HistoricalAggregator, HistorySource};
use crate::history::synthetic::SyntheticHistory;
use crate::types::observation::Observation;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loader for the historical traffic dataset
pub struct HistoryLoader {
    /// Candidate dataset paths, tried in order
    data_paths: Vec<PathBuf>,
    /// Seed for the synthetic fallback
    synthetic_seed: u64,
    /// Row count for the synthetic fallback
    synthetic_rows: usize,
}

impl HistoryLoader {
    /// Create a loader from configuration
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            data_paths: config.data_paths.iter().map(PathBuf::from).collect(),
            synthetic_seed: config.synthetic_seed,
            synthetic_rows: config.synthetic_rows,
        }
    }

    /// Load a dataset from a single CSV file.
    ///
    /// Missing-value markers read as absent signals. Records that still cannot
    /// be decoded are skipped with a warning; the load fails only when no
    /// usable record remains.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
        let path = path.as_ref();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open historical data {}", path.display()))?;

        let mut observations = Vec::new();
        let mut skipped = 0usize;
        let mut first_error = None;

        for record in reader.deserialize::<Observation>() {
            match record {
                Ok(observation) => observations.push(observation),
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable historical record");
                    skipped += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if observations.is_empty() {
            match first_error {
                Some(e) => {
                    return Err(e).with_context(|| {
                        format!("Corrupt historical data in {}", path.display())
                    })
                }
                None => bail!("Historical data file {} has no records", path.display()),
            }
        }

        if let Some(e) = first_error {
            warn!(
                path = %path.display(),
                skipped = skipped,
                first_error = %e,
                "Skipped undecodable historical records"
            );
        }

        Ok(observations)
    }

    /// Load from the first existing candidate path.
    pub fn load(&self) -> Result<(Vec<Observation>, PathBuf)> {
        let path = self
            .data_paths
            .iter()
            .find(|p| p.exists())
            .context("Historical data file not found in any expected location")?;

        let observations = Self::load_file(path)?;

        info!(
            path = %path.display(),
            records = observations.len(),
            "Loaded historical data"
        );

        Ok((observations, path.clone()))
    }

    /// Load the dataset, substituting synthetic observations on any failure.
    pub fn load_or_synthesize(&self) -> HistoricalAggregator {
        match self.load() {
            Ok((observations, path)) => {
                HistoricalAggregator::new(observations, HistorySource::File(path))
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Error loading historical data, using synthetic data");
                HistoricalAggregator::new(self.synthesize(), HistorySource::Synthetic)
            }
        }
    }

    fn synthesize(&self) -> Vec<Observation> {
        SyntheticHistory::new(self.synthetic_seed, self.synthetic_rows)
            .generate()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Synthetic data generation failed, imputing defaults only");
                Vec::new()
            })
    }
}
