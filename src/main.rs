//! Congestion Predictor - Main Entry Point
//!
//! Usage: congestion-predictor <area> <road> <weather> <roadwork> [date]
//!
//! Writes the congestion score to stdout; all diagnostics go to stderr.

use anyhow::Result;
use congestion_predictor::{
    config::{AppConfig, OutputFormat},
    logging,
    metrics::PipelineMetrics,
    pipeline::CongestionPipeline,
    types::PredictionRequest,
};
use std::process::ExitCode;
use tracing::error;

const USAGE: &str = "Usage: congestion-predictor <area_name> <road_name> <weather_conditions> <roadwork_activity> [prediction_date]\n\
                     Date format: YYYY-MM-DD (optional, defaults to current date)";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some(request) = PredictionRequest::from_args(&args) else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    match run(&request) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Prediction aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(request: &PredictionRequest) -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    logging::init(&config.logging)?;

    let mut metrics = PipelineMetrics::new();

    // Model and encoder loading is the only fatal step
    let pipeline = CongestionPipeline::from_config(&config, &mut metrics)?;

    let report = pipeline.predict_with_metrics(request, &mut metrics);
    metrics.print_summary();

    match config.output.format {
        // Debug formatting keeps the decimal point on whole scores ("50.0")
        OutputFormat::Plain => println!("{:?}", report.score),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
