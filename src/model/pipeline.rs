// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::messages::validation::ValidationCompleted;
use crate::observability::messages::StructuredLog;
use crate::pipeline::{validate_graph, EdgeSpec, NodeSpec, PipelineGraph};
use crate::traits::FeatureCatalog;

/// A named, versioned pipeline graph.
///
/// Every graph mutation bumps `version` and recomputes `is_valid`,
/// `validation_errors` and `warnings` against the catalog passed in. Runs
/// snapshot the graph, so editing a pipeline never affects existing runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub graph: PipelineGraph,
    pub version: u32,
    pub is_active: bool,
    pub is_valid: bool,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(
        name: impl Into<String>,
        graph: PipelineGraph,
        catalog: &dyn FeatureCatalog,
    ) -> Self {
        let now = Utc::now();
        let mut pipeline = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            graph,
            version: 1,
            is_active: true,
            is_valid: false,
            validation_errors: Vec::new(),
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        pipeline.revalidate(catalog);
        pipeline
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether a run may be created from this pipeline
    pub fn is_runnable(&self) -> bool {
        self.is_valid && self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }

    pub fn set_graph(&mut self, graph: PipelineGraph, catalog: &dyn FeatureCatalog) {
        self.graph = graph;
        self.bump(catalog);
    }

    pub fn add_node(&mut self, node: NodeSpec, catalog: &dyn FeatureCatalog) {
        self.graph.nodes.push(node);
        self.bump(catalog);
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, node_id: &str, catalog: &dyn FeatureCatalog) -> bool {
        let before = self.graph.nodes.len();
        self.graph.nodes.retain(|node| node.id != node_id);
        if self.graph.nodes.len() == before {
            return false;
        }
        self.graph
            .edges
            .retain(|edge| edge.from != node_id && edge.to != node_id);
        self.bump(catalog);
        true
    }

    pub fn add_edge(&mut self, edge: EdgeSpec, catalog: &dyn FeatureCatalog) {
        self.graph.edges.push(edge);
        self.bump(catalog);
    }

    /// Remove every edge `from -> to`.
    pub fn remove_edge(&mut self, from: &str, to: &str, catalog: &dyn FeatureCatalog) -> bool {
        let before = self.graph.edges.len();
        self.graph
            .edges
            .retain(|edge| !(edge.from == from && edge.to == to));
        if self.graph.edges.len() == before {
            return false;
        }
        self.bump(catalog);
        true
    }

    /// Re-run validation without changing the version, e.g. after features
    /// were published.
    pub fn revalidate(&mut self, catalog: &dyn FeatureCatalog) {
        let report = validate_graph(&self.graph, catalog);
        self.is_valid = report.is_valid();
        self.validation_errors = report.error_messages();
        self.warnings = report.warning_messages();

        ValidationCompleted {
            pipeline: &self.name,
            version: self.version,
            node_count: self.graph.nodes.len(),
            error_count: self.validation_errors.len(),
            warning_count: self.warnings.len(),
        }
        .log();
    }

    fn bump(&mut self, catalog: &dyn FeatureCatalog) {
        self.version += 1;
        self.updated_at = Utc::now();
        self.revalidate(catalog);
    }
}
