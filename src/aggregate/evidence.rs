//! Polarity resolution: one feature result to one signed piece of evidence.
//!
//! Resolution is explicit and total: every result either produces exactly one
//! `(sign, magnitude, weight)` triple or is excluded with a stated rule.
//! Nothing downstream ever re-reads scores, signatures or metadata.

use crate::features::{FeatureResult, Polarity};
use crate::profile::FeatureSettings;

/// Which side of the decision the evidence lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvidenceSign {
    Support,
    Oppose,
}

/// One admitted piece of evidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedEvidence {
    pub sign: EvidenceSign,
    /// Strength in [0, 1].
    pub magnitude: f32,
    /// Ensemble weight from the profile.
    pub weight: f32,
}

/// Resolve one result under one feature's settings.
///
/// Excluded (`None`): invalid results, and results whose decisiveness falls
/// below the feature's `confidence_threshold`. Neutral polarity resolves by
/// the signature (falling back to the score): at or above the 0.5 fence it
/// supports with the score as magnitude, below it opposes with `1 - score`,
/// so a neutral result far under the fence opposes strongly. An explicit
/// `polarity_preference` overrides the reported polarity before resolution.
pub fn resolve(result: &FeatureResult, settings: &FeatureSettings) -> Option<ResolvedEvidence> {
    if !result.valid {
        return None;
    }
    if result.decisiveness() < settings.confidence_threshold {
        return None;
    }
    let polarity = settings.polarity_preference.unwrap_or(result.polarity);
    let (sign, magnitude) = match polarity {
        Polarity::Positive => (EvidenceSign::Support, result.score),
        Polarity::Negative => (EvidenceSign::Oppose, result.score),
        Polarity::Neutral => {
            if result.signature_or_score() >= 0.5 {
                (EvidenceSign::Support, result.score)
            } else {
                (EvidenceSign::Oppose, 1.0 - result.score)
            }
        }
    };
    Some(ResolvedEvidence {
        sign,
        magnitude: magnitude.clamp(0.0, 1.0),
        weight: settings.weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKind;

    fn settings() -> FeatureSettings {
        FeatureSettings::for_kind(FeatureKind::Histogram)
    }

    #[test]
    fn invalid_results_are_excluded() {
        let result = FeatureResult::invalid("broke");
        assert_eq!(resolve(&result, &settings()), None);
    }

    #[test]
    fn fence_sitters_fail_the_admission_gate() {
        let result = FeatureResult::scored(0.5, Polarity::Neutral).with_signature(0.5);
        assert_eq!(resolve(&result, &settings()), None);

        let mut lenient = settings();
        lenient.confidence_threshold = 0.0;
        assert!(resolve(&result, &lenient).is_some());
    }

    #[test]
    fn neutral_below_the_fence_opposes_with_inverted_magnitude() {
        let result = FeatureResult::scored(0.1, Polarity::Neutral).with_signature(0.1);
        let ev = resolve(&result, &settings()).unwrap();
        assert_eq!(ev.sign, EvidenceSign::Oppose);
        assert!((ev.magnitude - 0.9).abs() < 1e-6, "magnitude {}", ev.magnitude);
    }

    #[test]
    fn preference_overrides_the_reported_polarity() {
        let result = FeatureResult::scored(0.8, Polarity::Positive);
        let mut flipped = settings();
        flipped.polarity_preference = Some(Polarity::Negative);
        let ev = resolve(&result, &flipped).unwrap();
        assert_eq!(ev.sign, EvidenceSign::Oppose);
        assert!((ev.magnitude - 0.8).abs() < 1e-6);
    }

    #[test]
    fn weight_rides_along_from_the_settings() {
        let result = FeatureResult::scored(0.9, Polarity::Positive);
        let mut weighted = settings();
        weighted.weight = 2.5;
        let ev = resolve(&result, &weighted).unwrap();
        assert_eq!(ev.weight, 2.5);
    }
}
