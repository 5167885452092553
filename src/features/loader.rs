// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::build_feature;
use crate::errors::FeatureError;
use crate::features::{FeatureRegistry, LoadedFeature};
use crate::traits::FeatureCatalog;

/// Resolves a feature hash to a loaded unit, consulting the registry first
/// and falling back to the catalog.
pub struct FeatureLoader {
    registry: Arc<FeatureRegistry>,
    catalog: Arc<dyn FeatureCatalog>,
}

impl FeatureLoader {
    pub fn new(registry: Arc<FeatureRegistry>, catalog: Arc<dyn FeatureCatalog>) -> Self {
        Self { registry, catalog }
    }

    pub fn load(&self, hash: &str) -> Result<Arc<LoadedFeature>, FeatureError> {
        if let Some(loaded) = self.registry.get(hash) {
            if loaded.record.hash == hash {
                return Ok(loaded);
            }
        }

        let record = self
            .catalog
            .by_hash(hash)
            .ok_or_else(|| FeatureError::NotFound {
                reference: hash.to_string(),
            })?;
        let unit = build_feature(&record)?;
        Ok(self.registry.register(record, unit))
    }

    pub fn registry(&self) -> &Arc<FeatureRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureManifest, FsFeatureCatalog};
    use serde_json::{json, Map};

    #[test]
    fn test_load_registers_once() {
        let catalog = Arc::new(FsFeatureCatalog::in_memory());
        let record = catalog
            .publish(FeatureManifest::builtin("flip", "reverse"))
            .unwrap();
        let registry = Arc::new(FeatureRegistry::new());
        let loader = FeatureLoader::new(Arc::clone(&registry), catalog);

        let first = loader.load(&record.hash).unwrap();
        let second = loader.load(&record.hash).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        let mut inputs = Map::new();
        inputs.insert("text".to_string(), json!("abc"));
        assert_eq!(first.unit.invoke(&inputs).unwrap(), json!("cba"));
    }

    #[test]
    fn test_unknown_hash() {
        let loader = FeatureLoader::new(
            Arc::new(FeatureRegistry::new()),
            Arc::new(FsFeatureCatalog::in_memory()),
        );
        assert!(matches!(
            loader.load("missing"),
            Err(FeatureError::NotFound { .. })
        ));
    }
}
