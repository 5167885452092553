// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::FeatureError;
use crate::features::{FeatureLoader, FeatureRegistry, FsFeatureCatalog};
use crate::observability::messages::{feature::*, StructuredLog};
use crate::utils::write_atomic;

/// Child side of the sandbox protocol.
///
/// Resolves `feature_hash` from the catalog at `catalog_dir`, checks that
/// every declared input is present, invokes the unit and writes its JSON
/// result to `output_path`. Any error leaves `output_path` untouched.
pub fn run_child(
    catalog_dir: &Path,
    feature_hash: &str,
    input_path: &Path,
    output_path: &Path,
) -> Result<(), FeatureError> {
    let catalog = Arc::new(FsFeatureCatalog::open(catalog_dir)?);
    let loader = FeatureLoader::new(Arc::new(FeatureRegistry::new()), catalog);
    let feature = loader.load(feature_hash)?;

    let inputs: Map<String, Value> = serde_json::from_slice(&std::fs::read(input_path)?)?;
    if let Some(missing) = feature
        .record
        .input_names()
        .find(|name| !inputs.contains_key(*name))
    {
        return Err(FeatureError::MissingInput {
            name: missing.to_string(),
        });
    }

    let started = FeatureInvocationStarted {
        feature: feature.record.name(),
        input_count: inputs.len(),
    };
    let span = started.span("feature_invocation");
    let _guard = span.enter();
    started.log();

    let start_time = Instant::now();
    let result = match feature.unit.invoke(&inputs) {
        Ok(result) => result,
        Err(error) => {
            FeatureInvocationFailed {
                feature: feature.record.name(),
                error: &error,
            }
            .log();
            return Err(error);
        }
    };

    FeatureInvocationCompleted {
        feature: feature.record.name(),
        duration: start_time.elapsed(),
    }
    .log();

    write_atomic(output_path, &serde_json::to_vec(&result)?)?;
    Ok(())
}
