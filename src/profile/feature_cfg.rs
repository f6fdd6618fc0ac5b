//! Per-feature configuration carried by a profile.

use crate::features::{FeatureKind, FeatureParams, Polarity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings for one feature module inside a profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSettings {
    pub enabled: bool,
    /// Ensemble weight; must be positive while enabled.
    pub weight: f32,
    /// Feature-specific tunables, validated by the module itself.
    pub parameters: FeatureParams,
    /// Forces the evidence sign regardless of what the module reports.
    pub polarity_preference: Option<Polarity>,
    /// Minimum decisiveness a result needs before its evidence is admitted.
    pub confidence_threshold: f32,
}

impl FeatureSettings {
    /// Default settings for one module kind, at its stock weight.
    pub fn for_kind(kind: FeatureKind) -> Self {
        Self {
            enabled: true,
            weight: kind.default_weight(),
            parameters: FeatureParams::new(),
            polarity_preference: None,
            confidence_threshold: 0.1,
        }
    }

    pub(crate) fn validate(&self, kind: FeatureKind, issues: &mut Vec<String>) {
        if self.enabled && !(self.weight.is_finite() && self.weight > 0.0) {
            issues.push(format!(
                "features.{kind}: weight must be positive while enabled: {}",
                self.weight
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) || !self.confidence_threshold.is_finite()
        {
            issues.push(format!(
                "features.{kind}: confidence_threshold must lie in [0, 1]: {}",
                self.confidence_threshold
            ));
        }
    }
}

/// The full six-module map at stock weights.
pub fn default_feature_map() -> BTreeMap<FeatureKind, FeatureSettings> {
    FeatureKind::ALL
        .into_iter()
        .map(|kind| (kind, FeatureSettings::for_kind(kind)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_map_covers_every_kind_and_validates() {
        let map = default_feature_map();
        assert_eq!(map.len(), FeatureKind::ALL.len());
        let mut issues = Vec::new();
        for (kind, settings) in &map {
            settings.validate(*kind, &mut issues);
        }
        assert!(issues.is_empty(), "{issues:?}");
        assert_eq!(map[&FeatureKind::Histogram].weight, 1.5);
        assert_eq!(map[&FeatureKind::Planarity].weight, 0.5);
    }

    #[test]
    fn zero_weight_on_enabled_feature_is_flagged() {
        let settings = FeatureSettings {
            weight: 0.0,
            ..FeatureSettings::for_kind(FeatureKind::Volume)
        };
        let mut issues = Vec::new();
        settings.validate(FeatureKind::Volume, &mut issues);
        assert_eq!(issues.len(), 1, "{issues:?}");
    }
}
