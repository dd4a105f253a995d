use std::collections::HashMap;

use async_trait::async_trait;
use scriptflow_store::RunStatus;
use thiserror::Error;

/// Errors from dispatching a script node.
#[derive(Debug, Error)]
pub enum DispatchError {
  /// The referenced script does not exist.
  #[error("script not found: {script_id}")]
  ScriptNotFound { script_id: String },

  /// The dispatcher could not run the script at all.
  #[error("dispatch failed: {message}")]
  Internal { message: String },
}

/// What the scheduler hands a dispatcher for one script node.
#[derive(Debug, Clone)]
pub struct DispatchContext {
  pub workflow_run_id: String,
  pub node_id: String,
  pub script_id: String,
  pub parameters: HashMap<String, String>,
}

/// The dispatcher's report for one script node execution.
#[derive(Debug, Clone)]
pub struct ScriptNodeOutcome {
  pub script_run_id: String,
  pub status: RunStatus,
  pub output: Option<String>,
  pub error: Option<String>,
}

/// Runs one script to completion on behalf of the workflow scheduler.
///
/// The scheduler stays agnostic of how scripts actually execute; the
/// production implementation spawns interpreter processes, tests substitute
/// canned outcomes.
#[async_trait]
pub trait ScriptDispatcher: Send + Sync {
  async fn dispatch(&self, context: DispatchContext) -> Result<ScriptNodeOutcome, DispatchError>;
}
