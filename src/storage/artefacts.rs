// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::Utc;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;

use super::blobs::BlobStore;
use super::records::{RecordStore, UpdateOutcome};
use crate::config::StorageConfig;
use crate::errors::{ArtefactError, StorageInconsistency};
use crate::model::ArtefactMeta;
use crate::observability::messages::artefact::{
    ArtefactDeduplicated, ArtefactDeleted, ArtefactMissing, ArtefactStored, InconsistencyFound,
    OrphanSweepCompleted, RefCountUnderflow, RetentionSweepCompleted, SweepDeleteFailed,
};
use crate::observability::messages::StructuredLog;
use crate::utils::sha256_hex;

pub const JSON_MIME_TYPE: &str = "application/json";
pub const SCHEMA_VERSION: u32 = 1;

/// What `put` did with a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    pub hash: String,
    pub compressed_size: u64,
    pub raw_size: u64,
    /// The content was already stored and nothing was written
    pub deduplicated: bool,
    pub storage_path: String,
}

impl PutReceipt {
    fn from_meta(meta: &ArtefactMeta, deduplicated: bool) -> Self {
        Self {
            hash: meta.hash.clone(),
            compressed_size: meta.size_bytes,
            raw_size: meta.uncompressed_size,
            deduplicated,
            storage_path: meta.storage_path.clone(),
        }
    }
}

enum Removal {
    Removed(ArtefactMeta),
    Refused(ArtefactMeta),
    Absent,
}

/// Findings of an orphan sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrphanReport {
    pub inconsistencies: Vec<StorageInconsistency>,
    pub blobs_removed: usize,
    pub records_removed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArtefactStats {
    pub count: usize,
    pub total_compressed: u64,
    pub total_uncompressed: u64,
    pub referenced: usize,
    pub unreferenced: usize,
}

/// Compressed bytes of one artefact, read straight from its blob file.
pub struct ArtefactStream {
    pub meta: ArtefactMeta,
    file: File,
}

impl ArtefactStream {
    /// Wrap the stream in a zstd decoder yielding the serialized payload.
    pub fn decoded(self) -> io::Result<zstd::Decoder<'static, io::BufReader<File>>> {
        zstd::Decoder::new(self.file)
    }
}

impl Read for ArtefactStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Content-addressed JSON artefacts.
///
/// The key is the SHA-256 of the serialized, uncompressed payload. Blobs are
/// zstd-compressed files under [`BlobStore`]; metadata and reference counts
/// live in the [`RecordStore`], one row per hash.
pub struct ArtefactStore {
    blobs: BlobStore,
    records: Arc<dyn RecordStore>,
    max_bytes: u64,
}

impl ArtefactStore {
    pub fn new(blobs: BlobStore, records: Arc<dyn RecordStore>, max_bytes: u64) -> Self {
        Self {
            blobs,
            records,
            max_bytes,
        }
    }

    /// Build a store rooted at the configured artefact directory.
    pub fn open(
        config: &StorageConfig,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, ArtefactError> {
        let root = config.get_artefacts_dir();
        std::fs::create_dir_all(&root)?;
        Ok(Self::new(
            BlobStore::new(root, config.get_compression_level()),
            records,
            config.get_max_artefact_bytes(),
        ))
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store a value, or find the identical one already stored.
    ///
    /// `attributes` are kept on the metadata row of a newly written artefact
    /// alongside the compression and serialization tags. Storing does not
    /// take a reference.
    pub fn put(
        &self,
        value: &Value,
        attributes: Map<String, Value>,
    ) -> Result<PutReceipt, ArtefactError> {
        let raw = serde_json::to_vec(value)?;
        let hash = sha256_hex(&raw);

        if let Some(existing) = self.records.load_artefact(&hash)? {
            if self.blobs.exists(&hash) {
                ArtefactDeduplicated { hash: &hash }.log();
                return Ok(PutReceipt::from_meta(&existing, true));
            }
        }

        let compressed = self.blobs.compress(&raw)?;
        let compressed_size = compressed.len() as u64;
        if compressed_size > self.max_bytes {
            return Err(ArtefactError::SizeExceeded {
                size: compressed_size,
                limit: self.max_bytes,
            });
        }

        self.blobs.write(&hash, &compressed)?;

        let mut attributes = attributes;
        attributes.insert("compression".to_string(), Value::from("zstd"));
        attributes.insert("serialization".to_string(), Value::from("json"));
        attributes.insert("schema_version".to_string(), Value::from(SCHEMA_VERSION));

        let now = Utc::now();
        let meta = ArtefactMeta {
            hash: hash.clone(),
            storage_path: BlobStore::relative_path(&hash),
            size_bytes: compressed_size,
            uncompressed_size: raw.len() as u64,
            mime_type: JSON_MIME_TYPE.to_string(),
            attributes,
            ref_count: 0,
            created_at: now,
            last_accessed_at: now,
        };

        if !self.records.insert_artefact(&meta)? {
            // Lost a race with an identical put
            let existing = self.metadata(&hash)?;
            ArtefactDeduplicated { hash: &hash }.log();
            return Ok(PutReceipt::from_meta(&existing, true));
        }

        ArtefactStored {
            hash: &hash,
            raw_size: meta.uncompressed_size,
            compressed_size,
        }
        .log();
        Ok(PutReceipt::from_meta(&meta, false))
    }

    /// Load and deserialize an artefact, verifying its content hash.
    pub fn get(&self, hash: &str) -> Result<Value, ArtefactError> {
        if self.records.load_artefact(hash)?.is_none() {
            return Err(ArtefactError::NotFound {
                hash: hash.to_string(),
            });
        }

        let compressed = match self.blobs.read_compressed(hash) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtefactError::BlobMissing {
                    hash: hash.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let raw = BlobStore::decompress(&compressed)?;
        let actual = sha256_hex(&raw);
        if actual != hash {
            return Err(ArtefactError::HashMismatch {
                expected: hash.to_string(),
                actual,
            });
        }
        let value = serde_json::from_slice(&raw)?;

        let now = Utc::now();
        self.records.update_artefact(hash, &mut |meta: &mut ArtefactMeta| {
            meta.last_accessed_at = now;
            true
        })?;
        Ok(value)
    }

    /// Open the compressed blob for streaming without decoding it.
    pub fn stream(&self, hash: &str) -> Result<ArtefactStream, ArtefactError> {
        let meta = self.metadata(hash)?;
        let file = match self.blobs.open(hash) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtefactError::BlobMissing {
                    hash: hash.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(ArtefactStream { meta, file })
    }

    pub fn metadata(&self, hash: &str) -> Result<ArtefactMeta, ArtefactError> {
        self.records
            .load_artefact(hash)?
            .ok_or_else(|| ArtefactError::NotFound {
                hash: hash.to_string(),
            })
    }

    pub fn exists(&self, hash: &str) -> Result<bool, ArtefactError> {
        Ok(self.records.load_artefact(hash)?.is_some() && self.blobs.exists(hash))
    }

    /// Take a reference. Returns the new count, or `None` for an unknown hash.
    pub fn increment_ref(&self, hash: &str) -> Result<Option<i64>, ArtefactError> {
        let outcome = self.records.update_artefact(hash, &mut |meta: &mut ArtefactMeta| {
            meta.ref_count += 1;
            true
        })?;
        match outcome {
            UpdateOutcome::Applied(meta) | UpdateOutcome::Rejected(meta) => Ok(Some(meta.ref_count)),
            UpdateOutcome::Missing => {
                ArtefactMissing {
                    hash,
                    operation: "increment reference count",
                }
                .log();
                Ok(None)
            }
        }
    }

    /// Release a reference. The count stops at zero.
    pub fn decrement_ref(&self, hash: &str) -> Result<Option<i64>, ArtefactError> {
        let outcome = self.records.update_artefact(hash, &mut |meta: &mut ArtefactMeta| {
            if meta.ref_count <= 0 {
                return false;
            }
            meta.ref_count -= 1;
            true
        })?;
        match outcome {
            UpdateOutcome::Applied(meta) => Ok(Some(meta.ref_count)),
            UpdateOutcome::Rejected(meta) => {
                RefCountUnderflow { hash }.log();
                Ok(Some(meta.ref_count.max(0)))
            }
            UpdateOutcome::Missing => {
                ArtefactMissing {
                    hash,
                    operation: "decrement reference count",
                }
                .log();
                Ok(None)
            }
        }
    }

    /// Remove an artefact's blob and metadata.
    ///
    /// Refuses with `Referenced` while `ref_count > 0` unless `force` is set.
    /// Returns `false` if the hash is unknown.
    pub fn delete(&self, hash: &str, force: bool) -> Result<bool, ArtefactError> {
        match self.remove_where(hash, |meta| force || meta.is_deletable())? {
            Removal::Removed(meta) => {
                ArtefactDeleted {
                    hash,
                    ref_count: meta.ref_count,
                    forced: !meta.is_deletable(),
                }
                .log();
                Ok(true)
            }
            Removal::Refused(meta) => Err(ArtefactError::Referenced {
                hash: hash.to_string(),
                ref_count: meta.ref_count,
            }),
            Removal::Absent => Ok(false),
        }
    }

    /// Drop the metadata row if `accept` holds for its value at the moment
    /// of removal, then the blob. A row changed by another writer in between
    /// is checked again.
    fn remove_where(
        &self,
        hash: &str,
        accept: impl Fn(&ArtefactMeta) -> bool,
    ) -> Result<Removal, ArtefactError> {
        let last_seen: RefCell<Option<(ArtefactMeta, bool)>> = RefCell::new(None);
        let removed = self.records.remove_artefact_if(hash, &|meta: &ArtefactMeta| {
            let accepted = accept(meta);
            *last_seen.borrow_mut() = Some((meta.clone(), accepted));
            accepted
        })?;

        match (removed, last_seen.into_inner()) {
            (true, Some((meta, _))) => {
                self.blobs.remove(hash)?;
                Ok(Removal::Removed(meta))
            }
            (false, Some((meta, false))) => Ok(Removal::Refused(meta)),
            _ => Ok(Removal::Absent),
        }
    }

    /// Reconcile blob files against metadata rows in both directions,
    /// removing whichever side is left without its counterpart.
    pub fn cleanup_orphans(&self) -> Result<OrphanReport, ArtefactError> {
        let blob_hashes: BTreeSet<String> = self.blobs.hashes()?.into_iter().collect();
        let record_hashes: BTreeSet<String> = self
            .records
            .list_artefacts()?
            .into_iter()
            .map(|meta| meta.hash)
            .collect();

        let mut report = OrphanReport::default();

        for hash in blob_hashes.difference(&record_hashes) {
            let inconsistency = StorageInconsistency::BlobWithoutRecord { hash: hash.clone() };
            InconsistencyFound {
                inconsistency: &inconsistency,
            }
            .log();
            if self.blobs.remove(hash)? {
                report.blobs_removed += 1;
            }
            report.inconsistencies.push(inconsistency);
        }

        for hash in record_hashes.difference(&blob_hashes) {
            let inconsistency = StorageInconsistency::RecordWithoutBlob { hash: hash.clone() };
            InconsistencyFound {
                inconsistency: &inconsistency,
            }
            .log();
            if self.records.remove_artefact(hash)? {
                report.records_removed += 1;
            }
            report.inconsistencies.push(inconsistency);
        }

        OrphanSweepCompleted {
            blobs_removed: report.blobs_removed,
            records_removed: report.records_removed,
        }
        .log();
        Ok(report)
    }

    /// Delete unreferenced artefacts not accessed within `max_age`.
    /// Returns how many were deleted; individual failures are logged and
    /// skipped.
    pub fn sweep_expired(&self, max_age: chrono::Duration) -> Result<usize, ArtefactError> {
        let cutoff = Utc::now() - max_age;
        let mut deleted = 0;

        for meta in self.records.list_artefacts()? {
            if !Self::expired(&meta, cutoff) {
                continue;
            }
            match self.remove_where(&meta.hash, |current| Self::expired(current, cutoff)) {
                Ok(Removal::Removed(removed)) => {
                    ArtefactDeleted {
                        hash: &removed.hash,
                        ref_count: removed.ref_count,
                        forced: false,
                    }
                    .log();
                    deleted += 1;
                }
                Ok(Removal::Refused(_)) | Ok(Removal::Absent) => {}
                Err(e) => SweepDeleteFailed {
                    hash: &meta.hash,
                    error: &e,
                }
                .log(),
            }
        }

        RetentionSweepCompleted {
            deleted,
            max_age_days: max_age.num_days(),
        }
        .log();
        Ok(deleted)
    }

    fn expired(meta: &ArtefactMeta, cutoff: chrono::DateTime<Utc>) -> bool {
        meta.ref_count == 0 && meta.last_accessed_at < cutoff
    }

    pub fn stats(&self) -> Result<ArtefactStats, ArtefactError> {
        let mut stats = ArtefactStats::default();
        for meta in self.records.list_artefacts()? {
            stats.count += 1;
            stats.total_compressed += meta.size_bytes;
            stats.total_uncompressed += meta.uncompressed_size;
            if meta.ref_count > 0 {
                stats.referenced += 1;
            } else {
                stats.unreferenced += 1;
            }
        }
        Ok(stats)
    }
}
