// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur during pipeline graph validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The top-level graph value does not have the expected shape
    MalformedGraph {
        /// What was wrong with the graph document
        reason: String,
    },
    /// A node entry could not be interpreted
    MalformedNode {
        /// Position of the node in the `nodes` list
        index: usize,
        /// What was wrong with the node
        reason: String,
    },
    /// An edge entry could not be interpreted
    MalformedEdge {
        /// Position of the edge in the `edges` list
        index: usize,
        /// What was wrong with the edge
        reason: String,
    },
    /// Two nodes share an ID
    DuplicateNodeId {
        /// The duplicate node ID
        node_id: String,
    },
    /// A node names neither a feature hash nor a feature name
    MissingFeatureReference {
        /// The node without a feature reference
        node_id: String,
    },
    /// A node's feature reference is not in the catalog
    UnknownFeature {
        /// The node holding the reference
        node_id: String,
        /// The hash or name that could not be resolved
        reference: String,
    },
    /// An edge endpoint names a node that doesn't exist
    DanglingEdge {
        /// Position of the edge in the `edges` list
        edge_index: usize,
        /// Either "source" or "target"
        endpoint: &'static str,
        /// The node ID that could not be found
        node_id: String,
    },
    /// A circular dependency was detected in the graph
    CyclicDependency {
        /// The cycle path, starting and ending on the same node
        cycle: Vec<String>,
    },
}

impl ValidationError {
    /// Structural errors stop validation before the cycle check runs.
    pub fn is_structural(&self) -> bool {
        !matches!(self, ValidationError::CyclicDependency { .. })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MalformedGraph { reason } => {
                write!(f, "Malformed graph: {}", reason)
            }
            ValidationError::MalformedNode { index, reason } => {
                write!(f, "Node {}: {}", index, reason)
            }
            ValidationError::MalformedEdge { index, reason } => {
                write!(f, "Edge {}: {}", index, reason)
            }
            ValidationError::DuplicateNodeId { node_id } => {
                write!(f, "Duplicate node ID: '{}'", node_id)
            }
            ValidationError::MissingFeatureReference { node_id } => {
                write!(
                    f,
                    "Node '{}' must specify 'feature_hash' or 'feature_name'",
                    node_id
                )
            }
            ValidationError::UnknownFeature { node_id, reference } => {
                write!(
                    f,
                    "Node '{}' references unknown feature '{}'",
                    node_id, reference
                )
            }
            ValidationError::DanglingEdge {
                edge_index,
                endpoint,
                node_id,
            } => {
                write!(
                    f,
                    "Edge {}: {} node '{}' not found",
                    edge_index, endpoint, node_id
                )
            }
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cycle detected: {}", cycle.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Advisory findings that do not make a graph invalid
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// A node with no incoming and no outgoing edges
    IsolatedNode { node_id: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::IsolatedNode { node_id } => {
                write!(f, "Node '{}' is isolated (no inputs or outputs)", node_id)
            }
        }
    }
}
