// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default storage root, relative to the working directory
pub const DEFAULT_STORAGE_ROOT: &str = "featurepipe_data";
/// Subdirectory of the storage root holding the sled record store
pub const RECORDS_DIR: &str = "records";
/// Subdirectory of the storage root holding artefact blobs
pub const ARTEFACTS_DIR: &str = "artefacts";
/// Subdirectory of the storage root holding the feature catalog
pub const FEATURES_DIR: &str = "features";

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;
/// Valid zstd compression levels
pub const MIN_COMPRESSION_LEVEL: i32 = 1;
pub const MAX_COMPRESSION_LEVEL: i32 = 22;
/// Largest compressed artefact accepted (100 MiB)
pub const DEFAULT_MAX_ARTEFACT_BYTES: u64 = 100 * 1024 * 1024;
/// Unreferenced artefacts untouched for this long are swept
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Wall-clock limit for one sandboxed invocation
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
/// Memory ceiling hint passed to the sandbox child
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 2048;

/// Total attempts per step in asynchronous mode
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Fixed delay between attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 60_000;
