//! Per-structure-type preset overrides.
//!
//! One explicit table, applied on top of the generic defaults. Presets touch
//! only what the family genuinely changes: geometry scale, a few weights and
//! feature tunables, the occasional polarity override. Everything they
//! produce must still pass [`DetectorProfile::validate`].

use super::{DetectorProfile, PatchShape, StructureType};
use crate::features::{FeatureKind, ParamValue, Polarity};

/// Mutate `profile` with the overrides for its structure type.
pub fn apply(profile: &mut DetectorProfile) {
    match profile.structure_type {
        StructureType::Windmill => windmill(profile),
        StructureType::Settlement => settlement(profile),
        StructureType::Earthwork => earthwork(profile),
        StructureType::Geoglyph => geoglyph(profile),
        StructureType::Generic => {}
    }
}

/// Compact circular mound, a few metres tall, with a pronounced dropoff.
fn windmill(profile: &mut DetectorProfile) {
    describe(profile, "compact circular mill mound");
    profile.geometry.structure_radius_m = 8.0;
    profile.geometry.min_structure_size_m = 6.0;
    profile.geometry.max_structure_size_m = 30.0;
    set_weight(profile, FeatureKind::Compactness, 1.2);
    set_weight(profile, FeatureKind::Dropoff, 1.1);
    set_param(
        profile,
        FeatureKind::Volume,
        "nominal_height_m",
        ParamValue::Num(3.0),
    );
}

/// Broad built-up platform: planar tops and hard edges, symmetry optional.
fn settlement(profile: &mut DetectorProfile) {
    describe(profile, "raised settlement platform");
    profile.geometry.structure_radius_m = 15.0;
    profile.geometry.patch_size_m = 80.0;
    profile.geometry.max_structure_size_m = 120.0;
    set_weight(profile, FeatureKind::Dropoff, 1.3);
    set_weight(profile, FeatureKind::Compactness, 0.8);
    set_weight(profile, FeatureKind::Planarity, 0.9);
    if let Some(settings) = profile.features.get_mut(&FeatureKind::Planarity) {
        settings.polarity_preference = Some(Polarity::Positive);
    }
}

/// Long bank-and-ditch work: elongated, volume-heavy, rarely circular.
fn earthwork(profile: &mut DetectorProfile) {
    describe(profile, "linear bank or enclosure earthwork");
    profile.geometry.structure_radius_m = 20.0;
    profile.geometry.patch_size_m = 100.0;
    profile.geometry.max_structure_size_m = 150.0;
    profile.geometry.patch_shape = PatchShape::Rectangle;
    profile.geometry.aspect_ratio_tolerance = 0.5;
    set_weight(profile, FeatureKind::Volume, 1.5);
    set_weight(profile, FeatureKind::Compactness, 0.6);
    set_weight(profile, FeatureKind::Entropy, 0.9);
}

/// Shallow surface marking on near-flat ground; relief floors come down.
fn geoglyph(profile: &mut DetectorProfile) {
    describe(profile, "shallow ground drawing");
    profile.geometry.structure_radius_m = 25.0;
    profile.geometry.patch_size_m = 120.0;
    profile.geometry.patch_shape = PatchShape::Irregular;
    profile.thresholds.detection_threshold = 0.5;
    set_weight(profile, FeatureKind::Entropy, 1.0);
    set_param(
        profile,
        FeatureKind::Histogram,
        "min_variation_m",
        ParamValue::Num(0.15),
    );
    set_param(
        profile,
        FeatureKind::Volume,
        "nominal_height_m",
        ParamValue::Num(0.8),
    );
    if let Some(settings) = profile.features.get_mut(&FeatureKind::Planarity) {
        settings.polarity_preference = Some(Polarity::Positive);
    }
}

fn describe(profile: &mut DetectorProfile, text: &str) {
    if profile.description.is_empty() {
        profile.description = text.to_string();
    }
}

fn set_weight(profile: &mut DetectorProfile, kind: FeatureKind, weight: f32) {
    if let Some(settings) = profile.features.get_mut(&kind) {
        settings.weight = weight;
    }
}

fn set_param(profile: &mut DetectorProfile, kind: FeatureKind, key: &str, value: ParamValue) {
    if let Some(settings) = profile.features.get_mut(&kind) {
        settings.parameters.insert(key.to_string(), value);
    }
}
