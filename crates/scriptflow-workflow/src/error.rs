use std::fmt;

// thiserror's derive treats any field named `source` as the error source,
// which requires it to implement `Error`; the `source` here is a node id
// string, so implement Display/Error by hand instead.
#[derive(Debug)]
pub enum WorkflowError {
  DuplicateNode(String),

  InvalidEdge { source: String, target: String },
}

impl fmt::Display for WorkflowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkflowError::DuplicateNode(id) => write!(f, "duplicate node id: {id}"),
      WorkflowError::InvalidEdge { source, target } => {
        write!(f, "edge references unknown node: source={source}, target={target}")
      }
    }
  }
}

impl std::error::Error for WorkflowError {}
