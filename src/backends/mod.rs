// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Feature implementations the sandbox child can load.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process Rust features selected by a `builtin` manifest entry:
//! - **Text Transformation**: case conversion, reversal, prefix/suffix addition
//! - **Text Analysis**: token counting, word frequency
//! - **Plumbing**: identity and numeric sum, useful for wiring tests
//!
//! ## Command Backend
//! External programs selected by a `command` manifest entry. The program
//! receives an inputs file and an output path, mirroring the sandbox child
//! protocol one level down.
//!
//! ## Stub Backend (Test-Only)
//! Step executors with scripted behaviour for orchestrator tests:
//! - **StubExecutor**: echoes, returns constants, fails, or fails N times
//! - **Note**: NOT available in production builds
//!
//! # Examples
//!
//! ```rust
//! use featurepipe::backends::build_feature;
//! use featurepipe::features::{FeatureManifest, FsFeatureCatalog};
//! use serde_json::{json, Map};
//!
//! let catalog = FsFeatureCatalog::in_memory();
//! let record = catalog.publish(FeatureManifest::builtin("shout", "uppercase"))?;
//! let feature = build_feature(&record)?;
//!
//! let mut inputs = Map::new();
//! inputs.insert("text".to_string(), json!("hi"));
//! assert_eq!(feature.invoke(&inputs)?, json!("HI"));
//! # Ok::<(), featurepipe::errors::FeatureError>(())
//! ```

use std::sync::Arc;

use crate::errors::FeatureError;
use crate::features::{FeatureEntry, FeatureRecord};
use crate::traits::Feature;

pub mod command;
pub mod local;
#[cfg(test)]
pub mod stub;

/// Turn a published record into an invocable unit.
pub fn build_feature(record: &FeatureRecord) -> Result<Arc<dyn Feature>, FeatureError> {
    match &record.manifest.entry {
        FeatureEntry::Builtin { processor, options } => {
            local::LocalFeatureFactory::create_feature(processor, options)
        }
        FeatureEntry::Command { program, args } => {
            let mut feature = command::CommandFeature::new(program.clone(), args.clone());
            if let Some(timeout) = crate::sandbox::timeout_from_env() {
                feature = feature.with_timeout(command::command_budget(timeout));
            }
            Ok(Arc::new(feature))
        }
    }
}
