// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline graph validation.
//!
//! This module contains message types for logging events related to:
//! * Cycle detection
//! * Isolated node warnings
//! * Validation outcomes after graph mutations

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Cycle detected in a pipeline graph.
///
/// # Log Level
/// `warn!` - The pipeline is marked invalid, nothing is executed
///
/// # Example
/// ```
/// use featurepipe::observability::messages::validation::CyclicDependencyDetected;
///
/// let cycle = vec!["a".to_string(), "b".to_string(), "a".to_string()];
/// let msg = CyclicDependencyDetected { cycle: &cycle };
///
/// assert_eq!(msg.to_string(), "Cycle detected: a -> b -> a");
/// ```
pub struct CyclicDependencyDetected<'a> {
    pub cycle: &'a [String],
}

impl Display for CyclicDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cycle detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicDependencyDetected<'_> {
    fn log(&self) {
        tracing::warn!(
            cycle = %self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "cycle_detected",
            span_name = name,
            cycle = %self.cycle.join(" -> "),
        )
    }
}

/// Node with neither incoming nor outgoing edges.
///
/// # Log Level
/// `warn!` - Advisory only
pub struct IsolatedNodeDetected<'a> {
    pub node_id: &'a str,
}

impl Display for IsolatedNodeDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Node '{}' is isolated (no inputs or outputs)", self.node_id)
    }
}

impl StructuredLog for IsolatedNodeDetected<'_> {
    fn log(&self) {
        tracing::warn!(node_id = self.node_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("isolated_node", span_name = name, node_id = self.node_id)
    }
}

/// Validation finished for a graph.
///
/// # Log Level
/// `debug!` when valid, `warn!` otherwise
pub struct ValidationCompleted<'a> {
    pub pipeline: &'a str,
    pub version: u32,
    pub node_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

impl Display for ValidationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.error_count == 0 {
            write!(
                f,
                "Pipeline '{}' v{} is valid: {} nodes, {} warnings",
                self.pipeline, self.version, self.node_count, self.warning_count
            )
        } else {
            write!(
                f,
                "Pipeline '{}' v{} is invalid: {} errors, {} warnings",
                self.pipeline, self.version, self.error_count, self.warning_count
            )
        }
    }
}

impl StructuredLog for ValidationCompleted<'_> {
    fn log(&self) {
        if self.error_count == 0 {
            tracing::debug!(
                pipeline = self.pipeline,
                version = self.version,
                node_count = self.node_count,
                warning_count = self.warning_count,
                "{}", self
            );
        } else {
            tracing::warn!(
                pipeline = self.pipeline,
                version = self.version,
                error_count = self.error_count,
                warning_count = self.warning_count,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "validation",
            span_name = name,
            pipeline = self.pipeline,
            version = self.version,
        )
    }
}
