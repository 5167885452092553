// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline graphs: the typed model, structural validation and scheduling.

pub mod graph;
pub mod scheduler;
pub mod validation;

pub use graph::{EdgeSpec, NodeSpec, PipelineGraph, DEFAULT_IN_PORT};
pub use scheduler::{dependencies, dependents, execution_layers, topological_sort};
pub use validation::{validate, validate_graph, ValidationReport};
