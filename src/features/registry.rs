// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::features::FeatureRecord;
use crate::observability::messages::{feature::FeatureRegistered, StructuredLog};
use crate::traits::Feature;

/// A feature loaded and ready to invoke
pub struct LoadedFeature {
    pub record: FeatureRecord,
    pub unit: Arc<dyn Feature>,
    pub loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for LoadedFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFeature")
            .field("name", &self.record.name())
            .field("hash", &self.record.hash)
            .field("unit", &self.unit.name())
            .finish()
    }
}

/// Summary row returned by [`FeatureRegistry::list`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub hash: String,
    pub name: String,
    pub version: u32,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryState {
    by_hash: HashMap<String, Arc<LoadedFeature>>,
    by_name: HashMap<String, String>,
}

impl RegistryState {
    fn resolve_key(&self, key: &str) -> Option<String> {
        if self.by_hash.contains_key(key) {
            return Some(key.to_string());
        }
        self.by_name.get(key).cloned()
    }
}

/// In-memory map from content hash (and name) to loaded units.
///
/// Every operation takes the same mutex. Entries stay until explicitly
/// unregistered or cleared.
#[derive(Default)]
pub struct FeatureRegistry {
    state: Mutex<RegistryState>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a unit under its hash, and make it the entry for its name.
    pub fn register(&self, record: FeatureRecord, unit: Arc<dyn Feature>) -> Arc<LoadedFeature> {
        let loaded = Arc::new(LoadedFeature {
            record,
            unit,
            loaded_at: Utc::now(),
        });

        let mut state = self.lock();
        state
            .by_name
            .insert(loaded.record.name().to_string(), loaded.record.hash.clone());
        state
            .by_hash
            .insert(loaded.record.hash.clone(), Arc::clone(&loaded));
        drop(state);

        FeatureRegistered {
            name: loaded.record.name(),
            hash: &loaded.record.hash,
        }
        .log();
        loaded
    }

    /// Remove by hash or by name.
    pub fn unregister(&self, key: &str) -> Option<Arc<LoadedFeature>> {
        let mut state = self.lock();
        let hash = state.resolve_key(key)?;
        let removed = state.by_hash.remove(&hash)?;
        if state.by_name.get(removed.record.name()) == Some(&hash) {
            state.by_name.remove(removed.record.name());
        }
        Some(removed)
    }

    /// Look up by hash or by name.
    pub fn get(&self, key: &str) -> Option<Arc<LoadedFeature>> {
        let state = self.lock();
        let hash = state.resolve_key(key)?;
        state.by_hash.get(&hash).cloned()
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.lock().resolve_key(key).is_some()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.by_hash.clear();
        state.by_name.clear();
    }

    pub fn list(&self) -> Vec<RegistryEntry> {
        let state = self.lock();
        let mut entries: Vec<RegistryEntry> = state
            .by_hash
            .values()
            .map(|loaded| RegistryEntry {
                hash: loaded.record.hash.clone(),
                name: loaded.record.name().to_string(),
                version: loaded.record.version,
                loaded_at: loaded.loaded_at,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.version.cmp(&b.version)));
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::IdentityFeature;
    use crate::features::{FeatureManifest, FsFeatureCatalog};

    fn published(catalog: &FsFeatureCatalog, name: &str, processor: &str) -> FeatureRecord {
        catalog
            .publish(FeatureManifest::builtin(name, processor))
            .unwrap()
    }

    #[test]
    fn test_register_and_get_by_hash_or_name() {
        let catalog = FsFeatureCatalog::in_memory();
        let record = published(&catalog, "echo", "identity");
        let registry = FeatureRegistry::new();

        registry.register(record.clone(), Arc::new(IdentityFeature));

        assert!(registry.is_loaded(&record.hash));
        assert!(registry.is_loaded("echo"));
        assert_eq!(registry.get("echo").unwrap().record.hash, record.hash);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_name_points_at_most_recent_registration() {
        let catalog = FsFeatureCatalog::in_memory();
        let v1 = published(&catalog, "echo", "identity");
        let v2 = published(&catalog, "echo", "reverse");
        let registry = FeatureRegistry::new();

        registry.register(v1.clone(), Arc::new(IdentityFeature));
        registry.register(v2.clone(), Arc::new(IdentityFeature));
        assert_eq!(registry.get("echo").unwrap().record.hash, v2.hash);

        // Removing the newer version drops the name mapping but keeps v1
        registry.unregister(&v2.hash).unwrap();
        assert!(!registry.is_loaded("echo"));
        assert!(registry.is_loaded(&v1.hash));
    }

    #[test]
    fn test_unregister_by_name_and_clear() {
        let catalog = FsFeatureCatalog::in_memory();
        let a = published(&catalog, "a", "identity");
        let b = published(&catalog, "b", "identity");
        let registry = FeatureRegistry::new();
        registry.register(a.clone(), Arc::new(IdentityFeature));
        registry.register(b, Arc::new(IdentityFeature));

        let removed = registry.unregister("a").unwrap();
        assert_eq!(removed.record.hash, a.hash);
        assert!(!registry.is_loaded(&a.hash));
        assert!(registry.unregister("a").is_none());

        let names: Vec<String> = registry.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b".to_string()]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration() {
        let catalog = FsFeatureCatalog::in_memory();
        let records: Vec<FeatureRecord> = (0..16)
            .map(|i| published(&catalog, &format!("f{}", i), "identity"))
            .collect();
        let registry = Arc::new(FeatureRegistry::new());

        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.register(record, Arc::new(IdentityFeature));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 16);
    }
}
