use std::collections::HashMap;

use scriptflow_config::{EdgeDef, NodeDef, WorkflowDef};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// A locked workflow ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub workflow_id: String,
  pub name: String,
  pub nodes: HashMap<String, NodeDef>,
  pub edges: Vec<EdgeDef>,
}

impl Workflow {
  /// Lock a definition, validating node id uniqueness and edge references.
  pub fn from_def(def: WorkflowDef) -> Result<Self, WorkflowError> {
    let mut nodes: HashMap<String, NodeDef> = HashMap::with_capacity(def.nodes.len());
    for node in def.nodes {
      if nodes.insert(node.node_id.clone(), node.clone()).is_some() {
        return Err(WorkflowError::DuplicateNode(node.node_id));
      }
    }

    for edge in &def.edges {
      if !nodes.contains_key(&edge.source) || !nodes.contains_key(&edge.target) {
        return Err(WorkflowError::InvalidEdge {
          source: edge.source.clone(),
          target: edge.target.clone(),
        });
      }
    }

    Ok(Self {
      workflow_id: def.workflow_id,
      name: def.name,
      nodes,
      edges: def.edges,
    })
  }

  /// Build the dependency graph for traversal.
  pub fn graph(&self) -> Graph {
    let node_ids: Vec<String> = self.nodes.keys().cloned().collect();
    Graph::new(&node_ids, &self.edges)
  }

  /// Get a node by id.
  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.get(node_id)
  }
}

#[cfg(test)]
mod tests {
  use scriptflow_config::{ConditionDef, NodeType};

  use super::*;

  fn node(id: &str) -> NodeDef {
    NodeDef {
      node_id: id.to_string(),
      node_type: NodeType::Delay { delay_seconds: 0 },
    }
  }

  fn edge(source: &str, target: &str) -> EdgeDef {
    EdgeDef {
      source: source.to_string(),
      target: target.to_string(),
      condition: None,
    }
  }

  fn def(nodes: Vec<NodeDef>, edges: Vec<EdgeDef>) -> WorkflowDef {
    WorkflowDef {
      workflow_id: "wf1".to_string(),
      name: "test".to_string(),
      nodes,
      edges,
    }
  }

  #[test]
  fn locks_a_valid_definition() {
    let workflow =
      Workflow::from_def(def(vec![node("a"), node("b")], vec![edge("a", "b")])).unwrap();
    assert_eq!(workflow.nodes.len(), 2);

    let graph = workflow.graph();
    assert_eq!(graph.entry_points(), ["a".to_string()]);
    assert_eq!(graph.dependencies("b").len(), 1);
    assert_eq!(graph.dependencies("b")[0].node_id, "a");
    assert_eq!(graph.successors("a")[0].node_id, "b");
  }

  #[test]
  fn rejects_duplicate_node_ids() {
    let err = Workflow::from_def(def(vec![node("a"), node("a")], vec![])).unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateNode(id) if id == "a"));
  }

  #[test]
  fn rejects_edge_to_unknown_node() {
    let err =
      Workflow::from_def(def(vec![node("a")], vec![edge("a", "ghost")])).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidEdge { target, .. } if target == "ghost"));
  }

  #[test]
  fn condition_is_carried_on_both_edge_directions() {
    let mut e = edge("a", "b");
    e.condition = Some(ConditionDef::Success {
      node_id: "a".to_string(),
    });
    let workflow = Workflow::from_def(def(vec![node("a"), node("b")], vec![e])).unwrap();
    let graph = workflow.graph();
    assert!(graph.dependencies("b")[0].condition.is_some());
    assert!(graph.successors("a")[0].condition.is_some());
  }

  #[test]
  fn multiple_entry_points_are_reported() {
    let workflow = Workflow::from_def(def(
      vec![node("a"), node("b"), node("c")],
      vec![edge("a", "c"), edge("b", "c")],
    ))
    .unwrap();
    let graph = workflow.graph();
    let mut entries = graph.entry_points().to_vec();
    entries.sort();
    assert_eq!(entries, ["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn cycle_has_no_entry_points() {
    let workflow = Workflow::from_def(def(
      vec![node("a"), node("b")],
      vec![edge("a", "b"), edge("b", "a")],
    ))
    .unwrap();
    assert!(workflow.graph().entry_points().is_empty());
  }
}
