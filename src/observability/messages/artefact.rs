// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for artefact storage events.

use crate::errors::StorageInconsistency;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// New blob written to the store.
///
/// # Log Level
/// `debug!` - Storage detail
///
/// # Example
/// ```
/// use featurepipe::observability::messages::artefact::ArtefactStored;
///
/// let msg = ArtefactStored {
///     hash: "9f86d081",
///     raw_size: 4096,
///     compressed_size: 512,
/// };
///
/// assert_eq!(msg.to_string(), "Stored artefact 9f86d081: 4096 bytes -> 512 bytes");
/// ```
pub struct ArtefactStored<'a> {
    pub hash: &'a str,
    pub raw_size: u64,
    pub compressed_size: u64,
}

impl Display for ArtefactStored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stored artefact {}: {} bytes -> {} bytes",
            self.hash, self.raw_size, self.compressed_size
        )
    }
}

impl StructuredLog for ArtefactStored<'_> {
    fn log(&self) {
        tracing::debug!(
            hash = self.hash,
            raw_size = self.raw_size,
            compressed_size = self.compressed_size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("artefact_put", span_name = name, hash = self.hash)
    }
}

/// Content already stored; nothing written.
///
/// # Log Level
/// `debug!`
pub struct ArtefactDeduplicated<'a> {
    pub hash: &'a str,
}

impl Display for ArtefactDeduplicated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Artefact {} already exists, skipping write", self.hash)
    }
}

impl StructuredLog for ArtefactDeduplicated<'_> {
    fn log(&self) {
        tracing::debug!(hash = self.hash, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("artefact_dedup", span_name = name, hash = self.hash)
    }
}

/// Blob and metadata removed.
///
/// # Log Level
/// `info!`
pub struct ArtefactDeleted<'a> {
    pub hash: &'a str,
    pub ref_count: i64,
    pub forced: bool,
}

impl Display for ArtefactDeleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.forced {
            write!(
                f,
                "Force-deleted artefact {} (ref_count={})",
                self.hash, self.ref_count
            )
        } else {
            write!(f, "Deleted artefact {}", self.hash)
        }
    }
}

impl StructuredLog for ArtefactDeleted<'_> {
    fn log(&self) {
        tracing::info!(
            hash = self.hash,
            ref_count = self.ref_count,
            forced = self.forced,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("artefact_delete", span_name = name, hash = self.hash)
    }
}

/// A decrement would have taken the count below zero.
///
/// # Log Level
/// `warn!`
pub struct RefCountUnderflow<'a> {
    pub hash: &'a str,
}

impl Display for RefCountUnderflow<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reference count of artefact {} is already zero, not decrementing",
            self.hash
        )
    }
}

impl StructuredLog for RefCountUnderflow<'_> {
    fn log(&self) {
        tracing::warn!(hash = self.hash, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("ref_underflow", span_name = name, hash = self.hash)
    }
}

/// Reference count operation on an unknown artefact.
///
/// # Log Level
/// `warn!`
pub struct ArtefactMissing<'a> {
    pub hash: &'a str,
    pub operation: &'a str,
}

impl Display for ArtefactMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cannot {}: artefact {} not found", self.operation, self.hash)
    }
}

impl StructuredLog for ArtefactMissing<'_> {
    fn log(&self) {
        tracing::warn!(hash = self.hash, operation = self.operation, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("artefact_missing", span_name = name, hash = self.hash)
    }
}

/// Disagreement found by the orphan sweep.
///
/// # Log Level
/// `warn!`
pub struct InconsistencyFound<'a> {
    pub inconsistency: &'a StorageInconsistency,
}

impl Display for InconsistencyFound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Storage inconsistency: {}", self.inconsistency)
    }
}

impl StructuredLog for InconsistencyFound<'_> {
    fn log(&self) {
        tracing::warn!(hash = self.inconsistency.hash(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "storage_inconsistency",
            span_name = name,
            hash = self.inconsistency.hash(),
        )
    }
}

/// Orphan sweep finished.
///
/// # Log Level
/// `info!`
pub struct OrphanSweepCompleted {
    pub blobs_removed: usize,
    pub records_removed: usize,
}

impl Display for OrphanSweepCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Orphan sweep removed {} blobs without records and {} records without blobs",
            self.blobs_removed, self.records_removed
        )
    }
}

impl StructuredLog for OrphanSweepCompleted {
    fn log(&self) {
        tracing::info!(
            blobs_removed = self.blobs_removed,
            records_removed = self.records_removed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("orphan_sweep", span_name = name)
    }
}

/// Retention sweep finished.
///
/// # Log Level
/// `info!`
pub struct RetentionSweepCompleted {
    pub deleted: usize,
    pub max_age_days: i64,
}

impl Display for RetentionSweepCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retention sweep deleted {} unreferenced artefacts older than {} days",
            self.deleted, self.max_age_days
        )
    }
}

impl StructuredLog for RetentionSweepCompleted {
    fn log(&self) {
        tracing::info!(
            deleted = self.deleted,
            max_age_days = self.max_age_days,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("retention_sweep", span_name = name)
    }
}

/// An artefact could not be removed during a sweep.
///
/// # Log Level
/// `warn!`
pub struct SweepDeleteFailed<'a> {
    pub hash: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SweepDeleteFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Failed to delete artefact {}: {}", self.hash, self.error)
    }
}

impl StructuredLog for SweepDeleteFailed<'_> {
    fn log(&self) {
        tracing::warn!(hash = self.hash, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("sweep_delete_failed", span_name = name, hash = self.hash)
    }
}
