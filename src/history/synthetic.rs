//! Synthetic historical data used when no dataset can be loaded

use crate::types::observation::Observation;
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Poisson};

/// Area/road pairs the synthetic rows cycle through
pub const SYNTHETIC_LOCATIONS: [(&str, &str); 3] = [
    ("Indiranagar", "100 Feet Road"),
    ("Koramangala", "5th Block"),
    ("Whitefield", "ITPL Main Road"),
];

/// Number of synthetic rows generated by default
pub const DEFAULT_SYNTHETIC_ROWS: usize = 300;

/// Seeded generator of plausible traffic observations.
pub struct SyntheticHistory {
    rng: StdRng,
    rows: usize,
}

impl SyntheticHistory {
    /// Create a generator with a fixed seed
    pub fn new(seed: u64, rows: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rows,
        }
    }

    /// Generate the observations.
    ///
    /// Locations cycle in a fixed order; signals are drawn from
    /// volume ~ N(1500, 300), speed ~ N(25, 5), utilization ~ N(75, 15),
    /// incidents ~ Poisson(2), pedestrians ~ N(50, 10).
    pub fn generate(mut self) -> Result<Vec<Observation>> {
        let volume = Normal::new(1500.0, 300.0).context("traffic volume distribution")?;
        let speed = Normal::new(25.0, 5.0).context("average speed distribution")?;
        let utilization = Normal::new(75.0, 15.0).context("capacity utilization distribution")?;
        let incidents = Poisson::new(2.0).context("incident distribution")?;
        let pedestrians = Normal::new(50.0, 10.0).context("pedestrian distribution")?;

        let observations = (0..self.rows)
            .map(|i| {
                let (area, road) = SYNTHETIC_LOCATIONS[i % SYNTHETIC_LOCATIONS.len()];
                Observation::new(
                    area,
                    road,
                    [
                        volume.sample(&mut self.rng),
                        speed.sample(&mut self.rng),
                        utilization.sample(&mut self.rng),
                        incidents.sample(&mut self.rng),
                        pedestrians.sample(&mut self.rng),
                    ],
                )
            })
            .collect();

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::NumericSignal;

    #[test]
    fn test_row_count_and_locations() {
        let rows = SyntheticHistory::new(7, DEFAULT_SYNTHETIC_ROWS)
            .generate()
            .unwrap();

        assert_eq!(rows.len(), 300);
        for (area, road) in SYNTHETIC_LOCATIONS {
            let count = rows.iter().filter(|o| o.area == area && o.road == road).count();
            assert_eq!(count, 100);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = SyntheticHistory::new(42, 30).generate().unwrap();
        let b = SyntheticHistory::new(42, 30).generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signals_are_plausible() {
        let rows = SyntheticHistory::new(42, DEFAULT_SYNTHETIC_ROWS)
            .generate()
            .unwrap();

        let mean = |signal: NumericSignal| {
            rows.iter().filter_map(|o| o.signal(signal)).sum::<f64>() / rows.len() as f64
        };

        assert!((mean(NumericSignal::TrafficVolume) - 1500.0).abs() < 100.0);
        assert!((mean(NumericSignal::AverageSpeed) - 25.0).abs() < 2.0);
        assert!((mean(NumericSignal::IncidentReports) - 2.0).abs() < 0.5);

        // Poisson draws are whole counts
        assert!(rows
            .iter()
            .filter_map(|o| o.incident_reports)
            .all(|v| v >= 0.0 && v.fract() == 0.0));
    }
}
