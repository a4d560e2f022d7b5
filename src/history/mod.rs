//! Historical traffic data used to impute numeric features

pub mod aggregator;
pub mod loader;
pub mod synthetic;

pub use aggregator::{HistoricalAggregator, HistorySource, Imputed, ImputedFrom};
pub use loader::HistoryLoader;
pub use synthetic::SyntheticHistory;
