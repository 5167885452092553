// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Durable state: the record store for pipelines, runs, steps and artefact
//! metadata, and the content-addressed artefact store built on top of it.

pub mod artefacts;
pub mod blobs;
pub mod records;
pub mod sled_store;
#[cfg(test)]
pub(crate) mod testing;

pub use artefacts::{ArtefactStats, ArtefactStore, OrphanReport, PutReceipt};
pub use blobs::BlobStore;
pub use records::{RecordStore, UpdateOutcome};
pub use sled_store::SledRecordStore;
