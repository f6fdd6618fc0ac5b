//! Explicit module registry.
//!
//! Maps every [`FeatureKind`] to a factory for its module. The table is
//! closed and constructed up front, so a profile can only ever name modules
//! that exist; tests swap individual factories to inject slow or panicking
//! modules.

use super::{
    CompactnessModule, DropoffModule, EntropyModule, FeatureKind, FeatureModule, HistogramModule,
    PlanarityModule, VolumeModule,
};
use std::collections::BTreeMap;

/// Factory building a fresh, default-configured module.
pub type ModuleFactory = fn() -> Box<dyn FeatureModule>;

/// Registry of feature-module factories, keyed by kind.
#[derive(Debug)]
pub struct FeatureRegistry {
    factories: BTreeMap<FeatureKind, ModuleFactory>,
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        let mut factories: BTreeMap<FeatureKind, ModuleFactory> = BTreeMap::new();
        factories.insert(FeatureKind::Histogram, || {
            Box::new(HistogramModule::default())
        });
        factories.insert(FeatureKind::Volume, || Box::new(VolumeModule::default()));
        factories.insert(FeatureKind::Dropoff, || Box::new(DropoffModule::default()));
        factories.insert(FeatureKind::Compactness, || {
            Box::new(CompactnessModule::default())
        });
        factories.insert(FeatureKind::Entropy, || Box::new(EntropyModule::default()));
        factories.insert(FeatureKind::Planarity, || {
            Box::new(PlanarityModule::default())
        });
        Self { factories }
    }
}

impl FeatureRegistry {
    /// Replace the factory for one kind. Later lookups get the new factory.
    pub fn register(&mut self, kind: FeatureKind, factory: ModuleFactory) {
        self.factories.insert(kind, factory);
    }

    /// Build a fresh module of the given kind.
    pub fn build(&self, kind: FeatureKind) -> Option<Box<dyn FeatureModule>> {
        self.factories.get(&kind).map(|f| f())
    }
}
