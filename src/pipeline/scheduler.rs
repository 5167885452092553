// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution ordering for validated pipeline graphs.
//!
//! Both orderings use Kahn's algorithm over edge in-degrees and re-check for
//! cycles: a graph that slipped past validation fails here with
//! [`SchedulingError::CycleDetected`] instead of silently dropping nodes.

use std::collections::{HashMap, VecDeque};

use crate::errors::SchedulingError;
use crate::pipeline::PipelineGraph;

struct Adjacency<'a> {
    in_degree: HashMap<&'a str, usize>,
    dependents: HashMap<&'a str, Vec<&'a str>>,
}

fn adjacency(graph: &PipelineGraph) -> Result<Adjacency<'_>, SchedulingError> {
    let mut in_degree: HashMap<&str, usize> = graph.node_ids().map(|id| (id, 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in &graph.edges {
        if !in_degree.contains_key(edge.from.as_str()) {
            return Err(SchedulingError::UnknownNode {
                node_id: edge.from.clone(),
            });
        }
        let degree = in_degree
            .get_mut(edge.to.as_str())
            .ok_or_else(|| SchedulingError::UnknownNode {
                node_id: edge.to.clone(),
            })?;
        *degree += 1;
        dependents
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    Ok(Adjacency {
        in_degree,
        dependents,
    })
}

/// Linear execution order: every node appears after all of its
/// dependencies. Ties are broken by declaration order.
pub fn topological_sort(graph: &PipelineGraph) -> Result<Vec<String>, SchedulingError> {
    let Adjacency {
        mut in_degree,
        dependents,
    } = adjacency(graph)?;

    let mut queue: VecDeque<&str> = graph
        .node_ids()
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();
    let mut ordered = Vec::with_capacity(graph.nodes.len());

    while let Some(node) = queue.pop_front() {
        ordered.push(node.to_string());
        for &dependent in dependents.get(node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if ordered.len() < graph.nodes.len() {
        return Err(SchedulingError::CycleDetected {
            ordered: ordered.len(),
            total: graph.nodes.len(),
        });
    }
    Ok(ordered)
}

/// Breadth-first layering.
///
/// Layer 0 holds every node without incoming edges; each following layer
/// holds the nodes whose in-degree drops to zero once the previous layer is
/// removed. No path connects two nodes of the same layer.
pub fn execution_layers(graph: &PipelineGraph) -> Result<Vec<Vec<String>>, SchedulingError> {
    let Adjacency {
        mut in_degree,
        dependents,
    } = adjacency(graph)?;

    let mut current: Vec<&str> = graph
        .node_ids()
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();
    let mut layers = Vec::new();
    let mut layered = 0;

    while !current.is_empty() {
        let mut next = Vec::new();
        for &node in &current {
            for &dependent in dependents.get(node).map(Vec::as_slice).unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(dependent);
                    }
                }
            }
        }
        layered += current.len();
        layers.push(current.iter().map(|id| id.to_string()).collect());
        current = next;
    }

    if layered < graph.nodes.len() {
        return Err(SchedulingError::CycleDetected {
            ordered: layered,
            total: graph.nodes.len(),
        });
    }
    Ok(layers)
}

/// Direct parents of `node_id`, in edge declaration order, without repeats.
pub fn dependencies(graph: &PipelineGraph, node_id: &str) -> Vec<String> {
    let mut parents: Vec<String> = Vec::new();
    for edge in graph.incoming(node_id) {
        if !parents.contains(&edge.from) {
            parents.push(edge.from.clone());
        }
    }
    parents
}

/// Direct children of `node_id`, in edge declaration order, without repeats.
pub fn dependents(graph: &PipelineGraph, node_id: &str) -> Vec<String> {
    let mut children: Vec<String> = Vec::new();
    for edge in graph.outgoing(node_id) {
        if !children.contains(&edge.to) {
            children.push(edge.to.clone());
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{EdgeSpec, NodeSpec};

    fn graph(ids: &[&str], pairs: &[(&str, &str)]) -> PipelineGraph {
        PipelineGraph::new(
            ids.iter().map(|id| NodeSpec::named(*id, "f")).collect(),
            pairs
                .iter()
                .map(|(from, to)| EdgeSpec::new(*from, *to))
                .collect(),
        )
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn test_fan_in_layers() {
        let g = graph(&["A", "B", "C"], &[("A", "C"), ("B", "C")]);
        assert_eq!(
            execution_layers(&g).unwrap(),
            vec![vec!["A".to_string(), "B".to_string()], vec!["C".to_string()]]
        );
    }

    #[test]
    fn test_diamond() {
        let g = graph(
            &["d", "c", "b", "a"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );

        let order = topological_sort(&g).unwrap();
        assert_eq!(order.first().map(String::as_str), Some("a"));
        assert_eq!(order.last().map(String::as_str), Some("d"));

        let layers = execution_layers(&g).unwrap();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[1].len(), 2);
    }

    #[test]
    fn test_independent_nodes_keep_declaration_order() {
        let g = graph(&["z", "y", "x"], &[]);
        assert_eq!(topological_sort(&g).unwrap(), vec!["z", "y", "x"]);
        assert_eq!(execution_layers(&g).unwrap(), vec![vec!["z", "y", "x"]]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);

        assert_eq!(
            topological_sort(&g),
            Err(SchedulingError::CycleDetected {
                ordered: 1,
                total: 3
            })
        );
        assert!(matches!(
            execution_layers(&g),
            Err(SchedulingError::CycleDetected { ordered: 1, total: 3 })
        ));
    }

    #[test]
    fn test_unknown_endpoint() {
        let g = graph(&["a"], &[("a", "ghost")]);
        assert_eq!(
            topological_sort(&g),
            Err(SchedulingError::UnknownNode {
                node_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn test_direct_neighbours() {
        let mut g = graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        g.edges.push(EdgeSpec::new("a", "c").with_in_port("other"));

        assert_eq!(dependencies(&g, "c"), vec!["a", "b"]);
        assert_eq!(dependents(&g, "a"), vec!["c"]);
        assert!(dependencies(&g, "a").is_empty());
    }

    #[test]
    fn test_random_dags_respect_every_edge() {
        for _ in 0..100 {
            let size = fastrand::usize(1..12);
            let ids: Vec<String> = (0..size).map(|i| format!("n{}", i)).collect();

            // Edges only go from lower to higher index, so the graph is acyclic
            let mut pairs = Vec::new();
            for to in 1..size {
                for from in 0..to {
                    if fastrand::u8(0..4) == 0 {
                        pairs.push((ids[from].as_str(), ids[to].as_str()));
                    }
                }
            }

            // Shuffle declaration order so it can't line up with the answer
            let mut declared: Vec<&str> = ids.iter().map(String::as_str).collect();
            fastrand::shuffle(&mut declared);
            let g = graph(&declared, &pairs);

            let order = topological_sort(&g).unwrap();
            let layers = execution_layers(&g).unwrap();
            assert_eq!(order.len(), size);
            assert_eq!(layers.iter().map(Vec::len).sum::<usize>(), size);

            let layer_of = |id: &str| layers.iter().position(|l| l.iter().any(|n| n == id)).unwrap();
            for (from, to) in &pairs {
                assert!(position(&order, from) < position(&order, to));
                assert!(layer_of(from) < layer_of(to));
            }
        }
    }
}
