//! Error types for workflow execution.

use thiserror::Error;

/// Errors that abort a workflow run before or during traversal.
///
/// Business outcomes (a failed script node, cancellation) are not errors;
/// they come back in the [`crate::WorkflowOutcome`].
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// The workflow graph cannot be executed at all.
  #[error("structural error: {message}")]
  Structural { message: String },

  /// A store operation failed.
  #[error("store error: {source}")]
  Store {
    #[from]
    source: scriptflow_store::Error,
  },
}
