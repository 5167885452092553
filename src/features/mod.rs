// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Feature packaging, the content-addressed catalog and the in-memory
//! registry of loaded units.

pub mod catalog;
pub mod loader;
pub mod manifest;
pub mod registry;

pub use catalog::FsFeatureCatalog;
pub use loader::FeatureLoader;
pub use manifest::{FeatureEntry, FeatureManifest, FeatureRecord, PortSpec};
pub use registry::{FeatureRegistry, LoadedFeature, RegistryEntry};
