use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("script not found: {script_id}")]
  ScriptNotFound { script_id: String },

  #[error("workflow not found: {workflow_id}")]
  WorkflowNotFound { workflow_id: String },

  #[error("invalid workflow: {source}")]
  InvalidWorkflow {
    #[from]
    source: scriptflow_workflow::WorkflowError,
  },

  #[error("store error: {source}")]
  Store {
    #[from]
    source: scriptflow_store::Error,
  },
}
