// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for feature packaging, registry and invocation events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Feature manifest published to the catalog.
///
/// # Log Level
/// `info!`
pub struct FeaturePublished<'a> {
    pub name: &'a str,
    pub hash: &'a str,
    pub version: u32,
    pub previous_hash: Option<&'a str>,
}

impl Display for FeaturePublished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.previous_hash {
            Some(previous) => write!(
                f,
                "Published feature '{}' v{} ({}), supersedes {}",
                self.name, self.version, self.hash, previous
            ),
            None => write!(
                f,
                "Published feature '{}' v{} ({})",
                self.name, self.version, self.hash
            ),
        }
    }
}

impl StructuredLog for FeaturePublished<'_> {
    fn log(&self) {
        tracing::info!(
            name = self.name,
            hash = self.hash,
            version = self.version,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("feature_publish", span_name = name, feature = self.name)
    }
}

/// Catalog file that could not be read while opening the catalog.
///
/// # Log Level
/// `warn!`
pub struct CatalogEntrySkipped<'a> {
    pub path: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CatalogEntrySkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipping unreadable catalog entry {}: {}", self.path, self.error)
    }
}

impl StructuredLog for CatalogEntrySkipped<'_> {
    fn log(&self) {
        tracing::warn!(path = self.path, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("catalog_entry_skipped", span_name = name, path = self.path)
    }
}

/// Feature loaded into the registry.
///
/// # Log Level
/// `debug!`
pub struct FeatureRegistered<'a> {
    pub name: &'a str,
    pub hash: &'a str,
}

impl Display for FeatureRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Registered feature '{}' ({})", self.name, self.hash)
    }
}

impl StructuredLog for FeatureRegistered<'_> {
    fn log(&self) {
        tracing::debug!(name = self.name, hash = self.hash, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("feature_register", span_name = name, feature = self.name)
    }
}

/// Feature invocation started.
///
/// # Log Level
/// `debug!`
///
/// # Example
/// ```
/// use featurepipe::observability::messages::feature::FeatureInvocationStarted;
///
/// let msg = FeatureInvocationStarted {
///     feature: "reverse",
///     input_count: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct FeatureInvocationStarted<'a> {
    pub feature: &'a str,
    pub input_count: usize,
}

impl Display for FeatureInvocationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Invoking feature '{}' with {} inputs",
            self.feature, self.input_count
        )
    }
}

impl StructuredLog for FeatureInvocationStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            feature = self.feature,
            input_count = self.input_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "feature_invocation",
            span_name = name,
            feature = self.feature,
            input_count = self.input_count,
        )
    }
}

/// Feature invocation completed.
///
/// # Log Level
/// `debug!`
pub struct FeatureInvocationCompleted<'a> {
    pub feature: &'a str,
    pub duration: Duration,
}

impl Display for FeatureInvocationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Feature '{}' completed in {:?}", self.feature, self.duration)
    }
}

impl StructuredLog for FeatureInvocationCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            feature = self.feature,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("feature_completed", span_name = name, feature = self.feature)
    }
}

/// Feature invocation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct FeatureInvocationFailed<'a> {
    pub feature: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for FeatureInvocationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Feature '{}' failed: {}", self.feature, self.error)
    }
}

impl StructuredLog for FeatureInvocationFailed<'_> {
    fn log(&self) {
        tracing::error!(feature = self.feature, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("feature_failed", span_name = name, feature = self.feature)
    }
}
