use std::collections::BTreeMap;

use structure_detector::aggregate::{aggregate, StreamingAggregator};
use structure_detector::features::{
    FeatureKind, FeatureModule, FeatureParams, FeatureRegistry, FeatureResult, Polarity,
};
use structure_detector::profile::DetectorProfile;
use structure_detector::raster::HeightGrid;
use structure_detector::synthetic::flat_patch;
use structure_detector::StructureDetector;

fn sample_entries() -> Vec<(FeatureKind, FeatureResult)> {
    vec![
        (
            FeatureKind::Histogram,
            FeatureResult::scored(0.85, Polarity::Neutral).with_signature(0.85),
        ),
        (
            FeatureKind::Volume,
            FeatureResult::scored(0.4, Polarity::Neutral).with_signature(0.4),
        ),
        (
            FeatureKind::Compactness,
            FeatureResult::scored(0.75, Polarity::Positive),
        ),
        (FeatureKind::Planarity, FeatureResult::invalid("sensor gap")),
        (
            FeatureKind::Dropoff,
            FeatureResult::scored(0.3, Polarity::Positive),
        ),
        (
            FeatureKind::Entropy,
            FeatureResult::scored(0.65, Polarity::Negative),
        ),
    ]
}

/// Every arrival order must land on the identical snapshot, and that
/// snapshot must equal the batch pass over the same map.
#[test]
fn arrival_order_never_changes_the_outcome() {
    let profile = DetectorProfile::default();
    let entries = sample_entries();

    let map: BTreeMap<FeatureKind, FeatureResult> = entries.iter().cloned().collect();
    let batch = aggregate(&map, &profile).unwrap();

    for shift in 0..entries.len() {
        let mut streaming = StreamingAggregator::new(&profile);
        for i in 0..entries.len() {
            let (kind, result) = &entries[(i + shift) % entries.len()];
            streaming.push(*kind, result.clone());
        }
        let snap = streaming.snapshot();
        assert_eq!(
            snap.aggregation, batch,
            "rotation by {shift} diverged from the batch pass"
        );
        assert_eq!(snap.completion_percentage, 100.0);
    }
}

/// More supporting score must never lower the final score.
#[test]
fn final_score_rises_with_supporting_score() {
    let profile = DetectorProfile::default();
    let mut last = f32::MIN;
    for pct in [55, 65, 75, 85, 95] {
        let score = pct as f32 / 100.0;
        let mut map = BTreeMap::new();
        map.insert(
            FeatureKind::Histogram,
            FeatureResult::scored(score, Polarity::Positive),
        );
        map.insert(
            FeatureKind::Volume,
            FeatureResult::scored(0.6, Polarity::Positive),
        );
        let out = aggregate(&map, &profile).unwrap();
        assert!(
            out.final_score > last,
            "score {score} produced {:.4}, not above {:.4}",
            out.final_score,
            last
        );
        last = out.final_score;
    }
}

/// A polarity preference redirects neutral evidence before resolution.
#[test]
fn polarity_preference_redirects_neutral_evidence() {
    let mut plain = DetectorProfile::default();
    for settings in plain.features.values_mut() {
        settings.enabled = false;
    }
    plain
        .features
        .get_mut(&FeatureKind::Planarity)
        .unwrap()
        .enabled = true;
    let mut preferred = plain.clone();
    preferred
        .features
        .get_mut(&FeatureKind::Planarity)
        .unwrap()
        .polarity_preference = Some(Polarity::Positive);

    // High score, low signature: neutral resolution opposes, an explicit
    // positive preference supports.
    let mut map = BTreeMap::new();
    map.insert(
        FeatureKind::Planarity,
        FeatureResult::scored(0.7, Polarity::Neutral).with_signature(0.2),
    );

    let opposed = aggregate(&map, &plain).unwrap();
    let supported = aggregate(&map, &preferred).unwrap();
    assert!(
        supported.final_score > opposed.final_score,
        "preference should flip the direction: {:.3} vs {:.3}",
        supported.final_score,
        opposed.final_score
    );
    assert!(opposed.final_score < 0.5);
    assert!(supported.final_score > 0.5);
}

struct ConstantModule {
    score: f32,
    polarity: Polarity,
}

impl FeatureModule for ConstantModule {
    fn name(&self) -> &'static str {
        "constant"
    }
    fn set_geometry(&mut self, _resolution_m: f32, _structure_radius_px: f32) {}
    fn configure(&mut self, _params: &FeatureParams) -> Result<(), String> {
        Ok(())
    }
    fn compute(&self, _grid: &HeightGrid) -> FeatureResult {
        FeatureResult::scored(self.score, self.polarity)
    }
}

/// Perfectly balanced evidence lands exactly on an inclusive threshold.
#[test]
fn score_at_the_threshold_counts_as_detected() {
    let mut profile = DetectorProfile::default();
    for settings in profile.features.values_mut() {
        settings.enabled = false;
    }
    for kind in [FeatureKind::Histogram, FeatureKind::Volume] {
        let settings = profile.features.get_mut(&kind).unwrap();
        settings.enabled = true;
        settings.weight = 1.0;
    }
    profile.thresholds.min_modules_for_decision = 2;
    profile.thresholds.base_weight = 1.0;
    profile.thresholds.evidence_weight = 1.0;
    profile.thresholds.detection_threshold = 0.5;
    profile.enable_refinement = false;

    let mut registry = FeatureRegistry::default();
    registry.register(FeatureKind::Histogram, || {
        Box::new(ConstantModule {
            score: 0.9,
            polarity: Polarity::Positive,
        })
    });
    registry.register(FeatureKind::Volume, || {
        Box::new(ConstantModule {
            score: 0.9,
            polarity: Polarity::Negative,
        })
    });

    let detector = StructureDetector::with_registry(profile, registry).unwrap();
    let result = detector.detect(&flat_patch(16, 0.0, 1.0)).unwrap();

    assert_eq!(result.final_score, 0.5);
    assert!(result.detected, "detection threshold is inclusive");
    assert_eq!(result.confidence, 0.0);
}
