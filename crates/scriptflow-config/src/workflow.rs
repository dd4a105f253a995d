use serde::{Deserialize, Serialize};

use crate::condition::ConditionDef;

/// A single node in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub node_id: String,
  #[serde(flatten)]
  pub node_type: NodeType,
}

/// Node behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeType {
  /// Executes a referenced script through the script execution engine.
  Script { script_id: String },
  /// Suspends the workflow's own driver for a fixed duration.
  Delay {
    #[serde(default)]
    delay_seconds: u64,
  },
  /// Evaluates a restricted boolean expression over prior node results and
  /// records the result as its output.
  Condition { expression: String },
}

/// A directed edge between two nodes, optionally guarded by a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<ConditionDef>,
}

/// A workflow definition as stored and edited by external tooling.
///
/// Node ids must be unique and edges must reference known node ids - both are
/// enforced when the definition is locked into a
/// `scriptflow_workflow::Workflow`. Nothing here forbids cycles; the
/// scheduler defends against them at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
}
