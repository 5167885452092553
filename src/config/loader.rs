// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::consts::*;
use crate::errors::ConfigError;
use crate::model::RunMode;

/// Main configuration structure.
///
/// Every section is optional; missing values fall back to the defaults in
/// [`crate::config::consts`] through the `get_*` accessors.
///
/// # Example
/// ```yaml
/// storage:
///   root: /var/lib/featurepipe
///   compression_level: 3
///   max_artefact_bytes: 104857600
///   retention_days: 30
/// sandbox:
///   timeout_seconds: 300
///   memory_limit_mb: 2048
///   keep_staging: false
/// executor_options:
///   max_concurrency: 4
///   retry_attempts: 3
///   retry_delay_ms: 60000
///   default_mode: async
/// features:
///   unresolved_policy: reject
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl Config {
    /// Check value bounds that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.storage.get_compression_level();
        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) {
            return Err(ConfigError::Invalid {
                field: "storage.compression_level",
                reason: format!(
                    "{} is outside {}..={}",
                    level, MIN_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL
                ),
            });
        }
        if self.storage.get_max_artefact_bytes() == 0 {
            return Err(ConfigError::Invalid {
                field: "storage.max_artefact_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sandbox.get_timeout().is_zero() {
            return Err(ConfigError::Invalid {
                field: "sandbox.timeout_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.executor_options.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid {
                field: "executor_options.max_concurrency",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.executor_options.retry_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                field: "executor_options.retry_attempts",
                reason: "counts total attempts and must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where and how records and artefacts are stored.
#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    pub root: Option<PathBuf>,
    pub compression_level: Option<i32>,
    pub max_artefact_bytes: Option<u64>,
    pub retention_days: Option<u32>,
}

impl StorageConfig {
    pub fn get_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT))
    }

    pub fn get_records_dir(&self) -> PathBuf {
        self.get_root().join(RECORDS_DIR)
    }

    pub fn get_artefacts_dir(&self) -> PathBuf {
        self.get_root().join(ARTEFACTS_DIR)
    }

    pub fn get_compression_level(&self) -> i32 {
        self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }

    pub fn get_max_artefact_bytes(&self) -> u64 {
        self.max_artefact_bytes.unwrap_or(DEFAULT_MAX_ARTEFACT_BYTES)
    }

    pub fn get_retention_days(&self) -> u32 {
        self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS)
    }
}

/// Child process limits and staging behaviour.
///
/// Without `program`, the sandbox re-enters the current executable in
/// `sandbox-child` mode. With it, `program args..` is run instead and
/// receives the same trailing `<hash> <inputs> <output>` arguments.
#[derive(Debug, Default, Deserialize)]
pub struct SandboxConfig {
    pub timeout_seconds: Option<u64>,
    pub memory_limit_mb: Option<u64>,
    pub program: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub keep_staging: bool,
}

impl SandboxConfig {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn get_memory_limit_mb(&self) -> u64 {
        self.memory_limit_mb.unwrap_or(DEFAULT_MEMORY_LIMIT_MB)
    }
}

/// Executor-specific configuration options.
///
/// # Fields
/// * `max_concurrency` - Jobs running at once in asynchronous mode (defaults to CPU count)
/// * `retry_attempts` - Total attempts per asynchronous step
/// * `retry_delay_ms` - Fixed delay between attempts
/// * `default_mode` - Mode used when a run doesn't ask for one
#[derive(Debug, Default, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub default_mode: Option<RunMode>,
}

impl ExecutorOptions {
    pub fn get_max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn get_retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    pub fn get_retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    pub fn get_default_mode(&self) -> RunMode {
        self.default_mode.unwrap_or_default()
    }
}

/// What to do at run creation with a node whose feature can't be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedFeaturePolicy {
    /// Drop the node from the run's step set and log a warning
    #[default]
    Skip,
    /// Refuse to create the run
    Reject,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturesConfig {
    pub catalog_dir: Option<PathBuf>,
    #[serde(default)]
    pub unresolved_policy: UnresolvedFeaturePolicy,
}

impl FeaturesConfig {
    pub fn get_catalog_dir(&self, storage: &StorageConfig) -> PathBuf {
        self.catalog_dir
            .clone()
            .unwrap_or_else(|| storage.get_root().join(FEATURES_DIR))
    }
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Load a config from a YAML file and check its values
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}
