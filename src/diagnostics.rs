//! Run diagnostics: detection phases, stage timings, progress events.

use crate::aggregate::StreamingAggregationResult;
use crate::features::FeatureResult;
use serde::{Deserialize, Serialize};

/// Phase of a detection call, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPhase {
    Dispatching,
    Collecting,
    Aggregating,
    Refining,
    Decided,
}

impl DetectionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionPhase::Dispatching => "dispatching",
            DetectionPhase::Collecting => "collecting",
            DetectionPhase::Aggregating => "aggregating",
            DetectionPhase::Refining => "refining",
            DetectionPhase::Decided => "decided",
        }
    }
}

impl std::fmt::Display for DetectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed time of a single phase or helper routine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Timing trace for one detection call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    pub fn stage_ms(&self, label: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.elapsed_ms)
    }
}

/// Streaming callback payload: one module reported, and where the running
/// aggregate stands because of it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub module: String,
    pub result: FeatureResult,
    pub streaming: StreamingAggregationResult,
    pub phase: DetectionPhase,
}
