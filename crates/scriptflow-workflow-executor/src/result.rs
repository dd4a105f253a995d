use std::collections::HashMap;

use scriptflow_store::{NodeRunStatus, WorkflowRunStatus};
use serde::{Deserialize, Serialize};

/// The recorded outcome of a single node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
  pub node_id: String,
  pub status: NodeRunStatus,
  /// Node output: script run summary for script nodes, delay details for
  /// delay nodes, the evaluated boolean for condition nodes, null for
  /// skipped nodes.
  pub output: serde_json::Value,
}

/// The outcome of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
  pub run_id: String,
  pub status: WorkflowRunStatus,
  pub nodes: HashMap<String, NodeOutcome>,
}
