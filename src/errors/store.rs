// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from the durable record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store failure: {0}")]
    Backend(#[from] sled::Error),

    #[error("Record could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Record '{key}' already exists")]
    Duplicate { key: String },
}
