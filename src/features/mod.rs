//! Feature modules: independent, stateless scorers over one elevation raster.
//!
//! Each module is a pure function of the raster it is handed: it never mutates
//! its input, never reaches outside the call, and tolerates any finite raster
//! shape by returning an invalid result when its geometry does not fit.
//! Geometry (ground sample distance, structure radius in cells) is pushed in
//! via [`FeatureModule::set_geometry`]; feature-specific tunables arrive as a
//! key-value bag that every module validates itself – unknown keys are
//! configuration errors, not silently ignored.
//!
//! Modules
//! - [`histogram`] – elevation-histogram similarity against a reference shape.
//! - [`volume`] – volume and prominence above a border-ring baseline.
//! - [`dropoff`] – difference-of-Gaussians boundary sharpness.
//! - [`compactness`] – radial symmetry of a ring sample.
//! - [`entropy`] – inverted surface roughness.
//! - [`planarity`] – least-squares plane residuals.

pub mod compactness;
pub mod dropoff;
pub mod entropy;
pub mod histogram;
pub mod planarity;
pub mod registry;
pub mod volume;

pub use compactness::CompactnessModule;
pub use dropoff::DropoffModule;
pub use entropy::EntropyModule;
pub use histogram::HistogramModule;
pub use planarity::PlanarityModule;
pub use registry::FeatureRegistry;
pub use volume::VolumeModule;

use crate::raster::HeightGrid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a piece of evidence argues for, against, or context-dependently
/// about the presence of a structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Supports "structure present".
    Positive,
    /// Supports "structure absent".
    Negative,
    /// Interpretation resolved at aggregation time from the result signature.
    Neutral,
}

impl Polarity {
    /// Stable string tag (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form per-feature tunable accepted by [`FeatureModule::configure`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Num(f64),
    List(Vec<f64>),
    Text(String),
}

impl ParamValue {
    /// Numeric value, if this parameter is one.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            ParamValue::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// List value, if this parameter is one.
    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            ParamValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// Bag of feature-specific tunables, keyed by parameter name.
pub type FeatureParams = BTreeMap<String, ParamValue>;

/// Diagnostic value attached to a [`FeatureResult`].
///
/// Never read by the aggregation math; the signed interpretation of neutral
/// evidence goes through [`FeatureResult::signature`] instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Num(f64),
    Text(String),
}

/// Outcome of one feature module on one raster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureResult {
    /// Evidence strength in [0, 1] when `valid`.
    pub score: f32,
    /// Signed reading of the evidence.
    pub polarity: Polarity,
    /// Whether the computation succeeded.
    pub valid: bool,
    /// Short human-readable diagnostic.
    pub reason: String,
    /// Signed-interpretation score consulted when `polarity` is `Neutral`:
    /// values at or above 0.5 read as supporting presence. Falls back to
    /// `score` when absent.
    pub signature: Option<f32>,
    /// Named diagnostic facts for debugging and reports.
    pub metadata: BTreeMap<String, MetaValue>,
}

impl FeatureResult {
    /// Valid result with the given score (clamped to [0, 1]) and polarity.
    pub fn scored(score: f32, polarity: Polarity) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            polarity,
            valid: true,
            reason: String::new(),
            signature: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Failed computation: zero score, neutral polarity, diagnostic reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            polarity: Polarity::Neutral,
            valid: false,
            reason: reason.into(),
            signature: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach the signed-interpretation signature.
    pub fn with_signature(mut self, signature: f32) -> Self {
        self.signature = Some(signature.clamp(0.0, 1.0));
        self
    }

    /// Attach a diagnostic reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Attach a numeric diagnostic.
    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metadata.insert(key.to_string(), MetaValue::Num(value));
        self
    }

    /// Signature when present, score otherwise.
    #[inline]
    pub fn signature_or_score(&self) -> f32 {
        self.signature.unwrap_or(self.score)
    }

    /// How far the result commits away from the 0.5 fence, in [0, 1].
    ///
    /// Used as the admission gate against a feature's configured
    /// `confidence_threshold` and by the refinement reweighting round.
    #[inline]
    pub fn decisiveness(&self) -> f32 {
        (2.0 * (self.signature_or_score() - 0.5)).abs().min(1.0)
    }
}

/// One independent scorer over an elevation raster.
///
/// Implementations must be pure in `compute`: no input mutation, no external
/// state, and any internal failure reported as an invalid result rather than
/// a panic.
pub trait FeatureModule: Send {
    /// Stable module name, matching the profile's feature tag.
    fn name(&self) -> &'static str;

    /// Push the detection geometry: ground sample distance and expected
    /// structure radius in cells.
    fn set_geometry(&mut self, resolution_m: f32, structure_radius_px: f32);

    /// Apply feature-specific tunables, rejecting unknown or out-of-range
    /// keys with a descriptive message.
    fn configure(&mut self, params: &FeatureParams) -> Result<(), String>;

    /// Score one raster.
    fn compute(&self, grid: &HeightGrid) -> FeatureResult;
}

/// Closed set of feature modules this crate ships.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Histogram,
    Volume,
    Dropoff,
    Compactness,
    Entropy,
    Planarity,
}

impl FeatureKind {
    /// All kinds in registry order.
    pub const ALL: [FeatureKind; 6] = [
        FeatureKind::Histogram,
        FeatureKind::Volume,
        FeatureKind::Dropoff,
        FeatureKind::Compactness,
        FeatureKind::Entropy,
        FeatureKind::Planarity,
    ];

    /// Stable string tag (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Histogram => "histogram",
            FeatureKind::Volume => "volume",
            FeatureKind::Dropoff => "dropoff",
            FeatureKind::Compactness => "compactness",
            FeatureKind::Entropy => "entropy",
            FeatureKind::Planarity => "planarity",
        }
    }

    /// Default ensemble weight before any profile override.
    pub fn default_weight(&self) -> f32 {
        match self {
            FeatureKind::Histogram => 1.5,
            FeatureKind::Volume => 1.2,
            FeatureKind::Dropoff => 1.0,
            FeatureKind::Compactness => 1.0,
            FeatureKind::Entropy => 0.8,
            FeatureKind::Planarity => 0.5,
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
