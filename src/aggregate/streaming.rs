//! Incremental aggregation with early-decision gating.
//!
//! Feeds arrive one result at a time, in whatever order the workers finish.
//! Every push recomputes the full aggregation from the accumulated map
//! rather than folding increments, so the state after the last push is the
//! batch result, bit for bit, regardless of arrival order.

use super::batch::{aggregate_partial, expected_evidence_count, AggregationResult};
use crate::features::{FeatureKind, FeatureResult};
use crate::profile::DetectorProfile;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregation snapshot after one arrival.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingAggregationResult {
    pub aggregation: AggregationResult,
    /// Arrived share of the expected modules, 0 to 100.
    pub completion_percentage: f32,
    /// Confidence with the expected module count as the coverage
    /// denominator, so missing modules keep dragging it down.
    pub streaming_confidence: f32,
    /// Whether the gate for deciding without the outstanding modules is open.
    pub early_decision_possible: bool,
}

/// Order-insensitive incremental aggregator for one detection call.
pub struct StreamingAggregator<'a> {
    profile: &'a DetectorProfile,
    expected: usize,
    results: BTreeMap<FeatureKind, FeatureResult>,
}

impl<'a> StreamingAggregator<'a> {
    pub fn new(profile: &'a DetectorProfile) -> Self {
        Self::with_expected(profile, expected_evidence_count(profile))
    }

    /// Aggregator expecting a caller-known number of modules (the dispatcher
    /// may trim the enabled set).
    pub fn with_expected(profile: &'a DetectorProfile, expected: usize) -> Self {
        Self {
            profile,
            expected: expected.max(1),
            results: BTreeMap::new(),
        }
    }

    /// Record one module's result and return the updated snapshot.
    pub fn push(&mut self, kind: FeatureKind, result: FeatureResult) -> StreamingAggregationResult {
        self.results.insert(kind, result);
        self.snapshot()
    }

    /// Current snapshot without recording anything.
    pub fn snapshot(&self) -> StreamingAggregationResult {
        let aggregation = aggregate_partial(&self.results, self.profile);
        let completed = self.results.len();
        let completion_percentage = (completed as f32 / self.expected as f32).min(1.0) * 100.0;
        let streaming_confidence = aggregation.confidence;

        let thresholds = &self.profile.thresholds;
        let score = aggregation.final_score;
        let beyond_threshold = score >= thresholds.early_decision_threshold
            || score <= 1.0 - thresholds.early_decision_threshold;
        let early_decision_possible = completed >= thresholds.min_modules_for_decision
            && streaming_confidence >= thresholds.confidence_threshold
            && beyond_threshold;

        StreamingAggregationResult {
            aggregation,
            completion_percentage,
            streaming_confidence,
            early_decision_possible,
        }
    }

    /// Modules that have reported so far.
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &BTreeMap<FeatureKind, FeatureResult> {
        &self.results
    }

    /// Hand the accumulated map back for the final batch pass.
    pub fn into_results(self) -> BTreeMap<FeatureKind, FeatureResult> {
        self.results
    }
}
