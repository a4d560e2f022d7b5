//! Per-invocation timing and fallback statistics for the prediction pipeline.

use crate::types::report::{Fallback, PredictionOutcome};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Pipeline stage being timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    LoadArtifacts,
    LoadHistory,
    Assemble,
    Infer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadArtifacts => "load_artifacts",
            Stage::LoadHistory => "load_history",
            Stage::Assemble => "assemble",
            Stage::Infer => "infer",
        };
        f.write_str(name)
    }
}

/// Metrics collector for one prediction invocation
pub struct PipelineMetrics {
    /// Start time of the invocation
    start_time: Instant,
    /// Time spent per stage
    stage_times: BTreeMap<Stage, Duration>,
    /// Fallback substitutions by kind
    fallbacks_by_kind: BTreeMap<&'static str, u64>,
    /// Final outcome and score
    outcome: Option<(PredictionOutcome, f64)>,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            stage_times: BTreeMap::new(),
            fallbacks_by_kind: BTreeMap::new(),
            outcome: None,
        }
    }

    /// Record time spent in a stage
    pub fn record_stage(&mut self, stage: Stage, duration: Duration) {
        *self.stage_times.entry(stage).or_default() += duration;
    }

    /// Run a closure and record its duration under a stage
    pub fn time<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        self.record_stage(stage, started.elapsed());
        result
    }

    /// Record substitutions made during a prediction
    pub fn record_fallbacks(&mut self, fallbacks: &[Fallback]) {
        for fallback in fallbacks {
            *self.fallbacks_by_kind.entry(fallback.label()).or_insert(0) += 1;
        }
    }

    /// Record the terminal state of the prediction
    pub fn record_outcome(&mut self, outcome: PredictionOutcome, score: f64) {
        self.outcome = Some((outcome, score));
    }

    /// Time recorded for a stage
    pub fn stage_time(&self, stage: Stage) -> Option<Duration> {
        self.stage_times.get(&stage).copied()
    }

    /// Number of substitutions of one kind
    pub fn fallback_count(&self, kind: &str) -> u64 {
        self.fallbacks_by_kind.get(kind).copied().unwrap_or(0)
    }

    /// Total substitutions
    pub fn total_fallbacks(&self) -> u64 {
        self.fallbacks_by_kind.values().sum()
    }

    /// Recorded outcome, if the prediction finished
    pub fn outcome(&self) -> Option<(PredictionOutcome, f64)> {
        self.outcome
    }

    /// Time since the collector was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let outcome = match self.outcome {
            Some((PredictionOutcome::Success, _)) => "success",
            Some((PredictionOutcome::Degraded, _)) => "degraded",
            None => "unfinished",
        };

        info!(
            outcome = outcome,
            score = self.outcome.map(|(_, s)| s),
            fallbacks = self.total_fallbacks(),
            elapsed_us = self.elapsed().as_micros() as u64,
            "Prediction summary"
        );

        for (stage, duration) in &self.stage_times {
            debug!(stage = %stage, duration_us = duration.as_micros() as u64, "Stage time");
        }
        for (kind, count) in &self.fallbacks_by_kind {
            debug!(kind = %kind, count = count, "Fallback substitutions");
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
