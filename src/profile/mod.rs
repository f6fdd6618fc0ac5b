//! Detection profiles: named, versioned, validated configuration.
//!
//! A profile fixes everything a detection run needs to be reproducible: the
//! expected geometry, the decision thresholds, which feature modules run at
//! which weights, and how their evidence is combined. Profiles persist as
//! JSON, round-trip losslessly and reject unknown fields on load; semantic
//! checks live in [`DetectorProfile::validate`], which reports every issue
//! at once instead of stopping at the first.

pub mod feature_cfg;
pub mod geometry;
pub mod io;
pub mod presets;
pub mod thresholds;

pub use feature_cfg::{default_feature_map, FeatureSettings};
pub use geometry::{GeometryParams, PatchShape};
pub use io::{load_profile, save_profile};
pub use thresholds::ThresholdParams;

use crate::features::FeatureKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structure family a profile is tuned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Windmill,
    Settlement,
    Earthwork,
    Geoglyph,
    Generic,
}

impl StructureType {
    pub const ALL: [StructureType; 5] = [
        StructureType::Windmill,
        StructureType::Settlement,
        StructureType::Earthwork,
        StructureType::Geoglyph,
        StructureType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StructureType::Windmill => "windmill",
            StructureType::Settlement => "settlement",
            StructureType::Earthwork => "earthwork",
            StructureType::Geoglyph => "geoglyph",
            StructureType::Generic => "generic",
        }
    }
}

impl std::str::FromStr for StructureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StructureType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown structure type `{s}`"))
    }
}

impl std::fmt::Display for StructureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How resolved evidence is combined into one score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Signed weighted balance of supporting vs. opposing evidence.
    WeightedEvidence,
    /// Supporting share of the resolved weight.
    MajorityVote,
}

fn default_max_workers() -> usize {
    5
}

/// Complete configuration of one detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub structure_type: StructureType,
    /// Version tag of the profile contents (not of the file format).
    pub version: String,
    pub geometry: GeometryParams,
    pub thresholds: ThresholdParams,
    pub features: BTreeMap<FeatureKind, FeatureSettings>,
    pub aggregation_method: AggregationMethod,
    /// Worker threads for module dispatch.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    pub enable_refinement: bool,
    pub max_refinement_attempts: u32,
}

impl Default for DetectorProfile {
    fn default() -> Self {
        Self {
            name: "generic-structure".to_string(),
            description: String::new(),
            structure_type: StructureType::Generic,
            version: "1.0".to_string(),
            geometry: GeometryParams::default(),
            thresholds: ThresholdParams::default(),
            features: default_feature_map(),
            aggregation_method: AggregationMethod::WeightedEvidence,
            max_workers: default_max_workers(),
            enable_refinement: true,
            max_refinement_attempts: 2,
        }
    }
}

impl DetectorProfile {
    /// Stock profile pre-tuned for one structure family.
    pub fn for_structure_type(structure_type: StructureType) -> Self {
        let mut profile = Self {
            structure_type,
            ..Self::default()
        };
        profile.optimize_for_structure_type();
        profile
    }

    /// Apply the preset overrides for this profile's structure type.
    pub fn optimize_for_structure_type(&mut self) {
        presets::apply(self);
    }

    /// Every semantic problem with this profile, empty when it is sound.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push("profile name must not be empty".into());
        }
        self.geometry.validate(&mut issues);
        self.thresholds.validate(&mut issues);
        if !self.features.values().any(|s| s.enabled) {
            issues.push("at least one feature must be enabled".into());
        }
        for (kind, settings) in &self.features {
            settings.validate(*kind, &mut issues);
        }
        if self.max_workers == 0 {
            issues.push("max_workers must be at least 1".into());
        }
        issues
    }

    /// Enabled features in key order.
    pub fn enabled_features(&self) -> impl Iterator<Item = (FeatureKind, &FeatureSettings)> {
        self.features
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(k, s)| (*k, s))
    }

    /// Enabled weights rescaled so they sum to the enabled count.
    pub fn normalized_weights(&self) -> BTreeMap<FeatureKind, f32> {
        let enabled: Vec<(FeatureKind, f32)> = self
            .enabled_features()
            .map(|(k, s)| (k, s.weight))
            .collect();
        let total: f32 = enabled.iter().map(|(_, w)| w).sum();
        if total <= f32::EPSILON {
            return BTreeMap::new();
        }
        let scale = enabled.len() as f32 / total;
        enabled.into_iter().map(|(k, w)| (k, w * scale)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        let issues = DetectorProfile::default().validate();
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn disabling_every_feature_is_flagged() {
        let mut profile = DetectorProfile::default();
        for settings in profile.features.values_mut() {
            settings.enabled = false;
        }
        let issues = profile.validate();
        assert!(
            issues.iter().any(|i| i.contains("at least one feature")),
            "{issues:?}"
        );
    }

    #[test]
    fn normalized_weights_sum_to_enabled_count() {
        let profile = DetectorProfile::default();
        let weights = profile.normalized_weights();
        let sum: f32 = weights.values().sum();
        assert!((sum - weights.len() as f32).abs() < 1e-4, "sum {sum}");
        // Relative ordering survives normalization.
        assert!(weights[&FeatureKind::Histogram] > weights[&FeatureKind::Planarity]);
    }

    #[test]
    fn validate_collects_multiple_issues_at_once() {
        let mut profile = DetectorProfile::default();
        profile.name.clear();
        profile.max_workers = 0;
        profile.thresholds.detection_threshold = 2.0;
        let issues = profile.validate();
        assert!(issues.len() >= 3, "{issues:?}");
    }
}
