// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::backends::local::LocalFeatureFactory;
use crate::errors::FeatureError;
use crate::features::{FeatureEntry, FeatureManifest, FeatureRecord};
use crate::observability::messages::{feature::*, StructuredLog};
use crate::traits::FeatureCatalog;
use crate::utils::write_atomic;

const RECORD_EXTENSION: &str = "json";

#[derive(Default)]
struct CatalogIndex {
    by_hash: HashMap<String, FeatureRecord>,
    /// name -> hash of the highest version
    latest: HashMap<String, String>,
}

impl CatalogIndex {
    fn insert(&mut self, record: FeatureRecord) {
        let newer = match self.latest.get(record.name()) {
            Some(current) => self
                .by_hash
                .get(current)
                .map_or(true, |existing| record.version > existing.version),
            None => true,
        };
        if newer {
            self.latest
                .insert(record.name().to_string(), record.hash.clone());
        }
        self.by_hash.insert(record.hash.clone(), record);
    }

    fn latest(&self, name: &str) -> Option<&FeatureRecord> {
        self.latest.get(name).and_then(|hash| self.by_hash.get(hash))
    }
}

/// Feature catalog stored as one `<hash>.json` document per version.
///
/// The sandbox child opens the same directory to resolve a feature by hash,
/// so the catalog lives in plain files rather than in the record store.
pub struct FsFeatureCatalog {
    dir: Option<PathBuf>,
    index: RwLock<CatalogIndex>,
}

impl FsFeatureCatalog {
    /// Open (or create) a catalog directory and index every record in it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, FeatureError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut index = CatalogIndex::default();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match read_record(&path) {
                Ok(record) => index.insert(record),
                Err(error) => CatalogEntrySkipped {
                    path: &path.display().to_string(),
                    error: &error,
                }
                .log(),
            }
        }

        Ok(Self {
            dir: Some(dir),
            index: RwLock::new(index),
        })
    }

    /// Catalog that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            index: RwLock::new(CatalogIndex::default()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Publish a manifest.
    ///
    /// Identical content returns the existing record unchanged. A new
    /// manifest under an existing name becomes the next version and links
    /// back to the previous latest through `previous_hash`.
    pub fn publish(&self, manifest: FeatureManifest) -> Result<FeatureRecord, FeatureError> {
        if let FeatureEntry::Builtin { processor, .. } = &manifest.entry {
            if !LocalFeatureFactory::is_implementation_available(processor) {
                return Err(FeatureError::UnknownImplementation {
                    name: processor.clone(),
                });
            }
        }

        let hash = manifest.content_hash()?;
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = index.by_hash.get(&hash) {
            return Ok(existing.clone());
        }

        let previous = index.latest(&manifest.name);
        let record = FeatureRecord {
            hash,
            version: previous.map_or(1, |p| p.version + 1),
            previous_hash: previous.map(|p| p.hash.clone()),
            manifest,
            created_at: Utc::now(),
        };

        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{}.{}", record.hash, RECORD_EXTENSION));
            write_atomic(&path, &serde_json::to_vec_pretty(&record)?)?;
        }

        FeaturePublished {
            name: record.name(),
            hash: &record.hash,
            version: record.version,
            previous_hash: record.previous_hash.as_deref(),
        }
        .log();

        index.insert(record.clone());
        Ok(record)
    }

    /// All records, ordered by name then version
    pub fn list(&self) -> Vec<FeatureRecord> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<FeatureRecord> = index.by_hash.values().cloned().collect();
        records.sort_by(|a, b| a.name().cmp(b.name()).then(a.version.cmp(&b.version)));
        records
    }

    /// Version chain for `name`, newest first
    pub fn history(&self, name: &str) -> Vec<FeatureRecord> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let mut chain = Vec::new();
        let mut cursor = index.latest(name);
        while let Some(record) = cursor {
            chain.push(record.clone());
            cursor = record
                .previous_hash
                .as_ref()
                .and_then(|hash| index.by_hash.get(hash));
        }
        chain
    }
}

fn read_record(path: &Path) -> Result<FeatureRecord, FeatureError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl FeatureCatalog for FsFeatureCatalog {
    fn by_hash(&self, hash: &str) -> Option<FeatureRecord> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.by_hash.get(hash).cloned()
    }

    fn by_name(&self, name: &str) -> Option<FeatureRecord> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.latest(name).cloned()
    }
}
