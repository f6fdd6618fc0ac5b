//! Batch evidence aggregation.
//!
//! Pure synchronous math over a map of feature results. Iteration follows
//! the map's key order, so the outcome is bit-for-bit independent of the
//! order modules happened to finish in.

use super::evidence::{resolve, EvidenceSign};
use super::AggregationError;
use crate::features::{FeatureKind, FeatureResult};
use crate::profile::{AggregationMethod, DetectorProfile, ThresholdParams};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one aggregation pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Blended decision score in [0, 1].
    pub final_score: f32,
    /// Coverage-scaled decisiveness in [0, 1].
    pub confidence: f32,
    /// Share of `final_score` contributed by the 0.5 prior.
    pub base_contribution: f32,
    /// Share of `final_score` contributed by the evidence.
    pub feature_contribution: f32,
    /// Admitted pieces of evidence.
    pub evidence_count: usize,
    pub reason: String,
}

/// Modules expected to report for this profile: enabled, capped by
/// `max_modules`.
pub fn expected_evidence_count(profile: &DetectorProfile) -> usize {
    profile
        .enabled_features()
        .count()
        .min(profile.thresholds.max_modules)
}

/// Aggregate a non-empty result map.
pub fn aggregate(
    results: &BTreeMap<FeatureKind, FeatureResult>,
    profile: &DetectorProfile,
) -> Result<AggregationResult, AggregationError> {
    if results.is_empty() {
        return Err(AggregationError::NoEvidence);
    }
    Ok(aggregate_partial(results, profile))
}

/// Total version of [`aggregate`]: an empty map degrades to the 0.5 prior
/// with zero confidence instead of erroring. The streaming path leans on
/// this being defined for every input.
pub(crate) fn aggregate_partial(
    results: &BTreeMap<FeatureKind, FeatureResult>,
    profile: &DetectorProfile,
) -> AggregationResult {
    let mut positive = 0.0f32;
    let mut negative = 0.0f32;
    let mut weight_total = 0.0f32;
    let mut supporting_weight = 0.0f32;
    let mut resolved = 0usize;
    let mut supporting = 0usize;

    for (kind, result) in results {
        let Some(settings) = profile.features.get(kind) else {
            continue;
        };
        if !settings.enabled {
            continue;
        }
        let Some(evidence) = resolve(result, settings) else {
            continue;
        };
        weight_total += evidence.weight;
        resolved += 1;
        match evidence.sign {
            EvidenceSign::Support => {
                positive += evidence.weight * evidence.magnitude;
                supporting_weight += evidence.weight;
                supporting += 1;
            }
            EvidenceSign::Oppose => negative += evidence.weight * evidence.magnitude,
        }
    }

    let feature_score = if weight_total > f32::EPSILON {
        match profile.aggregation_method {
            AggregationMethod::WeightedEvidence => {
                0.5 + 0.5 * ((positive - negative) / weight_total)
            }
            AggregationMethod::MajorityVote => supporting_weight / weight_total,
        }
    } else {
        0.5
    };
    let feature_score = feature_score.clamp(0.0, 1.0);
    let balance = 2.0 * feature_score - 1.0;

    let expected = expected_evidence_count(profile).max(1);
    let coverage = (resolved as f32 / expected as f32).min(1.0);
    let confidence = coverage * balance.abs();

    let (base_weight, evidence_weight) = profile.thresholds.blend();
    let base_contribution = base_weight * 0.5;
    let feature_contribution = evidence_weight * feature_score;

    let reason = if resolved == 0 {
        "no admissible evidence".to_string()
    } else {
        format!(
            "{supporting}/{resolved} evidences support, balance {balance:+.2}, coverage {:.0}%",
            coverage * 100.0
        )
    };

    AggregationResult {
        final_score: (base_contribution + feature_contribution).clamp(0.0, 1.0),
        confidence: confidence.clamp(0.0, 1.0),
        base_contribution,
        feature_contribution,
        evidence_count: resolved,
        reason,
    }
}

/// Whether a pass landed in the ambiguous band: confidence short of the
/// profile's floor while the score sits within the uncertainty tolerance of
/// the detection threshold.
pub fn is_ambiguous(result: &AggregationResult, thresholds: &ThresholdParams) -> bool {
    result.confidence < thresholds.confidence_threshold
        && (result.final_score - thresholds.detection_threshold).abs()
            <= thresholds.uncertainty_tolerance
}

/// Features worth a second look during refinement: every enabled feature
/// that failed, then the least decisive survivors, at most `limit` in total.
pub fn refinement_candidates(
    results: &BTreeMap<FeatureKind, FeatureResult>,
    profile: &DetectorProfile,
    limit: usize,
) -> Vec<FeatureKind> {
    let mut candidates: Vec<FeatureKind> = Vec::new();
    for (kind, result) in results {
        if profile.features.get(kind).is_some_and(|s| s.enabled) && !result.valid {
            candidates.push(*kind);
        }
    }
    let mut weak: Vec<(FeatureKind, f32)> = results
        .iter()
        .filter(|(kind, result)| {
            result.valid && profile.features.get(*kind).is_some_and(|s| s.enabled)
        })
        .map(|(kind, result)| (*kind, result.decisiveness()))
        .collect();
    weak.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    for (kind, _) in weak {
        if candidates.len() >= limit {
            break;
        }
        candidates.push(kind);
    }
    candidates.truncate(limit);
    candidates
}
