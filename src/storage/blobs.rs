// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

const BY_HASH_DIR: &str = "by_hash";
const BLOB_EXTENSION: &str = "zst";

/// Compressed blob files sharded by the first two hex digits of their hash:
/// `<root>/by_hash/ab/<hash>.zst`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    level: i32,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>, level: i32) -> Self {
        Self {
            root: root.into(),
            level,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a blob relative to the store root
    pub fn relative_path(hash: &str) -> String {
        format!("{}/{}/{}.{}", BY_HASH_DIR, shard(hash), hash, BLOB_EXTENSION)
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.root
            .join(BY_HASH_DIR)
            .join(shard(hash))
            .join(format!("{}.{}", hash, BLOB_EXTENSION))
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.path_for(hash).is_file()
    }

    pub fn compress(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        zstd::encode_all(raw, self.level)
    }

    pub fn decompress(compressed: &[u8]) -> io::Result<Vec<u8>> {
        zstd::decode_all(compressed)
    }

    /// Write a compressed blob unless one is already present.
    ///
    /// Returns `false` when the file existed; the existing content is kept.
    pub fn write(&self, hash: &str, compressed: &[u8]) -> io::Result<bool> {
        let path = self.path_for(hash);
        if path.is_file() {
            return Ok(false);
        }
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(compressed)?;
        staged.as_file().sync_all()?;
        match staged.persist_noclobber(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error),
        }
    }

    pub fn read_compressed(&self, hash: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(hash))
    }

    pub fn open(&self, hash: &str) -> io::Result<File> {
        File::open(self.path_for(hash))
    }

    /// Remove a blob. Returns `false` if there was nothing to remove.
    pub fn remove(&self, hash: &str) -> io::Result<bool> {
        match fs::remove_file(self.path_for(hash)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Hashes of every blob file on disk. Temp files from interrupted writes
    /// are not listed.
    pub fn hashes(&self) -> io::Result<Vec<String>> {
        let by_hash = self.root.join(BY_HASH_DIR);
        if !by_hash.is_dir() {
            return Ok(Vec::new());
        }

        let mut hashes = Vec::new();
        for shard_entry in fs::read_dir(&by_hash)? {
            let shard_path = shard_entry?.path();
            if !shard_path.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&shard_path)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXTENSION) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    hashes.push(stem.to_string());
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}

fn shard(hash: &str) -> &str {
    hash.get(..2).unwrap_or(hash)
}
