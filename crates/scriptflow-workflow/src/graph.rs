use std::collections::HashMap;

use scriptflow_config::{ConditionDef, EdgeDef};

/// One end of an edge as seen from a node: the peer node id plus the edge's
/// condition, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRef {
  pub node_id: String,
  pub condition: Option<ConditionDef>,
}

/// Adjacency structure for traversal.
///
/// Each node maps to its inbound dependency list (the edges it waits on) and
/// its outbound successor list (the mirror of the same edges). Both sides
/// carry the edge condition so the scheduler can evaluate it from either
/// direction.
#[derive(Debug, Clone)]
pub struct Graph {
  /// node_id -> edges pointing at this node.
  dependencies: HashMap<String, Vec<EdgeRef>>,
  /// node_id -> edges leaving this node.
  successors: HashMap<String, Vec<EdgeRef>>,
  /// Nodes with no inbound edges.
  entry_points: Vec<String>,
}

impl Graph {
  /// Build the graph from a validated node set and edge list.
  ///
  /// Callers must have checked that every edge references a known node id
  /// (see `Workflow::from_def`).
  pub(crate) fn new(node_ids: &[String], edges: &[EdgeDef]) -> Self {
    let mut dependencies: HashMap<String, Vec<EdgeRef>> = HashMap::new();
    let mut successors: HashMap<String, Vec<EdgeRef>> = HashMap::new();

    for node_id in node_ids {
      dependencies.entry(node_id.clone()).or_default();
      successors.entry(node_id.clone()).or_default();
    }

    for edge in edges {
      dependencies
        .entry(edge.target.clone())
        .or_default()
        .push(EdgeRef {
          node_id: edge.source.clone(),
          condition: edge.condition.clone(),
        });
      successors
        .entry(edge.source.clone())
        .or_default()
        .push(EdgeRef {
          node_id: edge.target.clone(),
          condition: edge.condition.clone(),
        });
    }

    let entry_points: Vec<String> = node_ids
      .iter()
      .filter(|id| dependencies.get(*id).is_none_or(|deps| deps.is_empty()))
      .cloned()
      .collect();

    Self {
      dependencies,
      successors,
      entry_points,
    }
  }

  /// Nodes with no inbound edges. A valid workflow has at least one.
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Inbound dependency edges for a node.
  pub fn dependencies(&self, node_id: &str) -> &[EdgeRef] {
    self
      .dependencies
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Outbound successor edges for a node.
  pub fn successors(&self, node_id: &str) -> &[EdgeRef] {
    self
      .successors
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
