// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::StoreError;

/// Errors raised by artefact storage operations. Each aborts only the
/// operation that raised it.
#[derive(Debug, Error)]
pub enum ArtefactError {
    #[error("Artefact size {size} bytes exceeds limit of {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("Artefact hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Artefact not found: {hash}")]
    NotFound { hash: String },

    #[error("Artefact blob missing for {hash}")]
    BlobMissing { hash: String },

    #[error("Cannot delete artefact {hash}: ref_count={ref_count}")]
    Referenced { hash: String, ref_count: i64 },

    #[error("Artefact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artefact payload could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Disagreement between the metadata index and the blob files, surfaced by
/// the orphan sweep.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageInconsistency {
    #[error("Blob {hash} has no metadata record")]
    BlobWithoutRecord { hash: String },

    #[error("Metadata record {hash} has no blob file")]
    RecordWithoutBlob { hash: String },
}

impl StorageInconsistency {
    pub fn hash(&self) -> &str {
        match self {
            StorageInconsistency::BlobWithoutRecord { hash }
            | StorageInconsistency::RecordWithoutBlob { hash } => hash,
        }
    }
}
