// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Port an upstream value binds to when an edge doesn't name one
pub const DEFAULT_IN_PORT: &str = "input";

/// A node in a pipeline graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_hash: Option<String>,
    /// Default parameter bindings, overridden by the run manifest and by edges
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports_out: Vec<String>,
}

impl NodeSpec {
    /// Node referencing a feature by name
    pub fn named(id: impl Into<String>, feature_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feature_name: Some(feature_name.into()),
            feature_hash: None,
            config: Map::new(),
            ports_in: Vec::new(),
            ports_out: Vec::new(),
        }
    }

    /// Node pinned to a specific feature hash
    pub fn pinned(id: impl Into<String>, feature_hash: impl Into<String>) -> Self {
        Self {
            feature_name: None,
            feature_hash: Some(feature_hash.into()),
            ..Self::named(id, String::new())
        }
    }

    /// The reference used for lookup: the hash when given, else the name
    pub fn feature_reference(&self) -> Option<&str> {
        fn given(reference: &Option<String>) -> Option<&str> {
            reference.as_deref().filter(|reference| !reference.is_empty())
        }
        given(&self.feature_hash).or_else(|| given(&self.feature_name))
    }
}

/// A directed edge `from -> to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_port: Option<String>,
}

impl EdgeSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            out_port: None,
            in_port: None,
        }
    }

    pub fn with_in_port(mut self, port: impl Into<String>) -> Self {
        self.in_port = Some(port.into());
        self
    }

    pub fn in_port(&self) -> &str {
        self.in_port.as_deref().unwrap_or(DEFAULT_IN_PORT)
    }
}

/// A pipeline DAG. Node and edge order is preserved as declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineGraph {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl PipelineGraph {
    pub fn new(nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.id.as_str())
    }

    /// Edges pointing at `node_id`, in declaration order
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EdgeSpec> {
        self.edges.iter().filter(move |edge| edge.to == node_id)
    }

    /// Edges leaving `node_id`, in declaration order
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EdgeSpec> {
        self.edges.iter().filter(move |edge| edge.from == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_schema_deserializes_optional_fields() {
        let graph: PipelineGraph = serde_json::from_value(json!({
            "nodes": [
                {"id": "load", "feature_name": "loader", "config": {"path": "x.csv"}},
                {"id": "clean", "feature_hash": "abc", "ports_in": ["frame"]}
            ],
            "edges": [
                {"id": "e1", "from": "load", "to": "clean", "in_port": "frame"}
            ]
        }))
        .unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].feature_reference(), Some("loader"));
        assert_eq!(graph.nodes[1].feature_reference(), Some("abc"));
        assert_eq!(graph.edges[0].in_port(), "frame");
        assert_eq!(graph.incoming("clean").count(), 1);
        assert_eq!(graph.outgoing("load").count(), 1);
    }

    #[test]
    fn test_in_port_defaults_to_input() {
        let edge = EdgeSpec::new("a", "b");
        assert_eq!(edge.in_port(), DEFAULT_IN_PORT);
    }

    #[test]
    fn test_hash_takes_precedence_over_name() {
        let mut node = NodeSpec::named("a", "loader");
        node.feature_hash = Some("deadbeef".to_string());
        assert_eq!(node.feature_reference(), Some("deadbeef"));

        let empty = NodeSpec::named("b", "");
        assert_eq!(empty.feature_reference(), None);
    }

    #[test]
    fn test_blank_hash_falls_back_to_name() {
        let node: NodeSpec = serde_json::from_value(json!({
            "id": "a", "feature_hash": "", "feature_name": "upper"
        }))
        .unwrap();
        assert_eq!(node.feature_reference(), Some("upper"));

        let mut blank = NodeSpec::named("b", "");
        blank.feature_hash = Some(String::new());
        assert_eq!(blank.feature_reference(), None);
    }
}
