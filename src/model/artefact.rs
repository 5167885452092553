// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata row for one content-addressed blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactMeta {
    pub hash: String,
    /// Path relative to the artefact root
    pub storage_path: String,
    /// Compressed size on disk
    pub size_bytes: u64,
    pub uncompressed_size: u64,
    pub mime_type: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub ref_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl ArtefactMeta {
    pub fn is_deletable(&self) -> bool {
        self.ref_count <= 0
    }

    pub fn compression_ratio(&self) -> f64 {
        if self.uncompressed_size == 0 {
            return 0.0;
        }
        self.size_bytes as f64 / self.uncompressed_size as f64
    }
}
