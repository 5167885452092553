// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline graph validation.
//!
//! Validation runs in a fixed order and stops early when the graph is not
//! structurally sound, since later checks need a well-formed graph:
//!
//! 1. **Shape**: the document is an object with `nodes` and `edges` lists,
//!    every node has a string `id` and every edge a `from` and `to`
//! 2. **Nodes**: ids are unique and each feature reference resolves in the
//!    catalog (by hash when given, else by name)
//! 3. **Edges**: both endpoints name declared nodes
//! 4. **Cycles**: three-colour DFS, reporting the offending path
//! 5. **Advisory**: nodes with no edges at all are flagged as isolated
//!
//! Shape errors stop validation immediately. Errors from steps 2 and 3 are
//! accumulated so that one pass reports every broken reference, and the
//! cycle check only runs when there are none.
//!
//! # Example
//! ```
//! use featurepipe::features::{FeatureManifest, FsFeatureCatalog};
//! use featurepipe::pipeline::validate;
//! use serde_json::json;
//!
//! let catalog = FsFeatureCatalog::in_memory();
//! catalog.publish(FeatureManifest::builtin("upper", "uppercase")).unwrap();
//!
//! let report = validate(
//!     &json!({
//!         "nodes": [
//!             {"id": "a", "feature_name": "upper"},
//!             {"id": "b", "feature_name": "upper"}
//!         ],
//!         "edges": [{"from": "a", "to": "b"}, {"from": "b", "to": "a"}]
//!     }),
//!     &catalog,
//! );
//!
//! let (valid, errors) = report.into_parts();
//! assert!(!valid);
//! assert_eq!(errors, vec!["Cycle detected: a -> b -> a"]);
//! ```

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::errors::{ValidationError, ValidationWarning};
use crate::observability::messages::validation::{CyclicDependencyDetected, IsolatedNodeDetected};
use crate::observability::messages::StructuredLog;
use crate::pipeline::{EdgeSpec, NodeSpec, PipelineGraph};
use crate::traits::FeatureCatalog;

/// Outcome of validating one graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `(valid, error messages)`
    pub fn into_parts(self) -> (bool, Vec<String>) {
        let valid = self.is_valid();
        (valid, self.errors.iter().map(ToString::to_string).collect())
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    fn invalid(errors: Vec<ValidationError>) -> Self {
        Self {
            errors,
            warnings: Vec::new(),
        }
    }
}

/// Validate a raw graph document.
pub fn validate(graph: &Value, catalog: &dyn FeatureCatalog) -> ValidationReport {
    match parse_graph(graph) {
        Ok(parsed) => validate_graph(&parsed, catalog),
        Err(errors) => ValidationReport::invalid(errors),
    }
}

/// Validate an already-typed graph.
pub fn validate_graph(graph: &PipelineGraph, catalog: &dyn FeatureCatalog) -> ValidationReport {
    let mut errors = validate_nodes(graph, catalog);

    errors.extend(validate_edges(graph));
    if !errors.is_empty() {
        return ValidationReport::invalid(errors);
    }

    if let Some(cycle) = find_cycle(graph) {
        CyclicDependencyDetected { cycle: &cycle }.log();
        errors.push(ValidationError::CyclicDependency { cycle });
    }

    let warnings = isolated_nodes(graph);
    ValidationReport { errors, warnings }
}

/// Turn the raw document into a typed graph, collecting every shape error.
fn parse_graph(graph: &Value) -> Result<PipelineGraph, Vec<ValidationError>> {
    let Some(object) = graph.as_object() else {
        return Err(vec![ValidationError::MalformedGraph {
            reason: format!("expected an object, found {}", json_kind(graph)),
        }]);
    };

    let nodes = list_field(object.get("nodes"), "nodes")?;
    let edges = list_field(object.get("edges"), "edges")?;
    let mut errors = Vec::new();

    let mut parsed_nodes = Vec::with_capacity(nodes.len());
    for (index, raw) in nodes.iter().enumerate() {
        match parse_node(raw) {
            Ok(node) => parsed_nodes.push(node),
            Err(reason) => errors.push(ValidationError::MalformedNode { index, reason }),
        }
    }

    let mut parsed_edges = Vec::with_capacity(edges.len());
    for (index, raw) in edges.iter().enumerate() {
        match parse_edge(raw) {
            Ok(edge) => parsed_edges.push(edge),
            Err(reason) => errors.push(ValidationError::MalformedEdge { index, reason }),
        }
    }

    if errors.is_empty() {
        Ok(PipelineGraph::new(parsed_nodes, parsed_edges))
    } else {
        Err(errors)
    }
}

/// A missing list counts as empty.
fn list_field<'a>(
    value: Option<&'a Value>,
    field: &str,
) -> Result<&'a [Value], Vec<ValidationError>> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(vec![ValidationError::MalformedGraph {
            reason: format!("'{}' must be a list, found {}", field, json_kind(other)),
        }]),
    }
}

fn parse_node(raw: &Value) -> Result<NodeSpec, String> {
    let object = raw
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", json_kind(raw)))?;
    match object.get("id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        Some(Value::String(_)) => return Err("'id' must not be empty".to_string()),
        Some(other) => return Err(format!("'id' must be a string, found {}", json_kind(other))),
        None => return Err("missing 'id'".to_string()),
    }
    serde_json::from_value(raw.clone()).map_err(|e| e.to_string())
}

fn parse_edge(raw: &Value) -> Result<EdgeSpec, String> {
    let object = raw
        .as_object()
        .ok_or_else(|| format!("expected an object, found {}", json_kind(raw)))?;
    for endpoint in ["from", "to"] {
        match object.get(endpoint) {
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(format!(
                    "'{}' must be a string, found {}",
                    endpoint,
                    json_kind(other)
                ))
            }
            None => return Err(format!("missing '{}'", endpoint)),
        }
    }
    serde_json::from_value(raw.clone()).map_err(|e| e.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn validate_nodes(graph: &PipelineGraph, catalog: &dyn FeatureCatalog) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
            continue;
        }

        match node.feature_reference() {
            None => errors.push(ValidationError::MissingFeatureReference {
                node_id: node.id.clone(),
            }),
            Some(reference) => {
                if catalog.resolve(node).is_none() {
                    errors.push(ValidationError::UnknownFeature {
                        node_id: node.id.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }
    }
    errors
}

fn validate_edges(graph: &PipelineGraph) -> Vec<ValidationError> {
    let node_ids: HashSet<&str> = graph.node_ids().collect();
    let mut errors = Vec::new();

    for (edge_index, edge) in graph.edges.iter().enumerate() {
        for (endpoint, node_id) in [("source", &edge.from), ("target", &edge.to)] {
            if !node_ids.contains(node_id.as_str()) {
                errors.push(ValidationError::DanglingEdge {
                    edge_index,
                    endpoint,
                    node_id: node_id.clone(),
                });
            }
        }
    }
    errors
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

/// First cycle found by a DFS started from each node in declaration order.
///
/// The path starts and ends on the node the back edge returns to, so
/// `a -> b -> a` for a two-node loop and `a -> a` for a self edge.
fn find_cycle(graph: &PipelineGraph) -> Option<Vec<String>> {
    let mut adjacency: HashMap<&str, Vec<&str>> =
        graph.node_ids().map(|id| (id, Vec::new())).collect();
    for edge in &graph.edges {
        if let Some(targets) = adjacency.get_mut(edge.from.as_str()) {
            targets.push(edge.to.as_str());
        }
    }

    let mut colours: HashMap<&str, Colour> =
        graph.node_ids().map(|id| (id, Colour::White)).collect();
    let mut path = Vec::new();

    for start in graph.node_ids() {
        if colours.get(start) == Some(&Colour::White) {
            if let Some(cycle) = visit(start, &adjacency, &mut colours, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    colours: &mut HashMap<&'a str, Colour>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    colours.insert(node, Colour::Grey);
    path.push(node);

    for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or_default() {
        match colours.get(next).copied().unwrap_or(Colour::Black) {
            Colour::White => {
                if let Some(cycle) = visit(next, adjacency, colours, path) {
                    return Some(cycle);
                }
            }
            Colour::Grey => {
                let start = path.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            Colour::Black => {}
        }
    }

    path.pop();
    colours.insert(node, Colour::Black);
    None
}

fn isolated_nodes(graph: &PipelineGraph) -> Vec<ValidationWarning> {
    let connected: HashSet<&str> = graph
        .edges
        .iter()
        .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()])
        .collect();

    graph
        .node_ids()
        .filter(|id| !connected.contains(id))
        .map(|node_id| {
            IsolatedNodeDetected { node_id }.log();
            ValidationWarning::IsolatedNode {
                node_id: node_id.to_string(),
            }
        })
        .collect()
}
