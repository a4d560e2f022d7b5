//! Tracing subscriber setup.
//!
//! Diagnostics always go to stderr so that stdout carries only the
//! prediction result. `RUST_LOG` takes precedence over the configured level.

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Log target prefix for this crate
pub const TARGET_PREFIX: &str = "congestion_predictor";

/// Build the filter: `RUST_LOG` if set and valid, else the configured level
/// for this crate and `warn` for dependencies.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let directive = format!("warn,{}={}", TARGET_PREFIX, config.level);
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the global tracing subscriber.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config);

    let result = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_config_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };
        let filter = build_env_filter(&config);
        assert!(filter.to_string().contains("congestion_predictor=debug"));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "very loud".to_string(),
            format: "pretty".to_string(),
        };
        assert!(!build_env_filter(&config)
            .to_string()
            .contains(TARGET_PREFIX));
    }
}
