//! Decision thresholds and the base/evidence blend.

use serde::{Deserialize, Serialize};

/// Scoring thresholds. Every `*_threshold` and tolerance lives in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdParams {
    /// Final score at or above which a structure is declared (inclusive).
    pub detection_threshold: f32,
    /// Minimum confidence for a decision to count as unambiguous.
    pub confidence_threshold: f32,
    /// Streaming: final score beyond this (in either direction) permits an
    /// early decision.
    pub early_decision_threshold: f32,
    /// Half-width of the in-doubt band around the detection threshold.
    pub uncertainty_tolerance: f32,
    /// Blend weight of the 0.5 prior in the final score.
    pub base_weight: f32,
    /// Blend weight of the evidence score in the final score.
    pub evidence_weight: f32,
    /// Streaming: completions required before any early decision.
    pub min_modules_for_decision: usize,
    /// Cap on modules dispatched per detection.
    pub max_modules: usize,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            detection_threshold: 0.55,
            confidence_threshold: 0.5,
            early_decision_threshold: 0.65,
            uncertainty_tolerance: 0.1,
            base_weight: 0.6,
            evidence_weight: 0.4,
            min_modules_for_decision: 3,
            max_modules: 6,
        }
    }
}

impl ThresholdParams {
    /// Base/evidence blend weights normalized to sum to one.
    pub fn blend(&self) -> (f32, f32) {
        let sum = self.base_weight + self.evidence_weight;
        if sum <= f32::EPSILON {
            return (0.5, 0.5);
        }
        (self.base_weight / sum, self.evidence_weight / sum)
    }

    pub(crate) fn validate(&self, issues: &mut Vec<String>) {
        let unit_fields = [
            ("thresholds.detection_threshold", self.detection_threshold),
            ("thresholds.confidence_threshold", self.confidence_threshold),
            (
                "thresholds.early_decision_threshold",
                self.early_decision_threshold,
            ),
            ("thresholds.uncertainty_tolerance", self.uncertainty_tolerance),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                issues.push(format!("{name} must lie in [0, 1]: {value}"));
            }
        }
        for (name, value) in [
            ("thresholds.base_weight", self.base_weight),
            ("thresholds.evidence_weight", self.evidence_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                issues.push(format!("{name} must be non-negative: {value}"));
            }
        }
        if self.base_weight + self.evidence_weight <= f32::EPSILON {
            issues.push("thresholds: base_weight and evidence_weight cannot both be zero".into());
        }
        if self.min_modules_for_decision == 0 {
            issues.push("thresholds.min_modules_for_decision must be at least 1".into());
        }
        if self.max_modules == 0 {
            issues.push("thresholds.max_modules must be at least 1".into());
        }
        if self.min_modules_for_decision > self.max_modules {
            issues.push(format!(
                "thresholds.min_modules_for_decision {} exceeds max_modules {}",
                self.min_modules_for_decision, self.max_modules
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_are_clean() {
        let mut issues = Vec::new();
        ThresholdParams::default().validate(&mut issues);
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn blend_normalizes_to_one() {
        let thresholds = ThresholdParams {
            base_weight: 1.2,
            evidence_weight: 0.8,
            ..ThresholdParams::default()
        };
        let (base, evidence) = thresholds.blend();
        assert!((base + evidence - 1.0).abs() < 1e-6);
        assert!((base - 0.6).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_threshold_is_flagged() {
        let thresholds = ThresholdParams {
            detection_threshold: 1.4,
            ..ThresholdParams::default()
        };
        let mut issues = Vec::new();
        thresholds.validate(&mut issues);
        assert!(issues.iter().any(|i| i.contains("detection_threshold")));
    }
}
