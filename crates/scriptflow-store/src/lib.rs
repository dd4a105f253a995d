//! Scriptflow Store
//!
//! This crate provides the storage trait and implementations for script runs,
//! workflow runs, and per-node run records. Data is persisted to SQLite; an
//! in-memory implementation is available for tests and embedding.
//!
//! Updates to run records are monotonic: once a record reaches a terminal
//! status, further updates are silently ignored. This lets a cancellation
//! path and a completion path race without corrupting the record.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
/// JSON column wrapper, re-exported so callers build records without a
/// direct sqlx dependency.
pub use sqlx::types::Json;
pub use types::{NodeRun, NodeRunStatus, RunStatus, ScriptRun, WorkflowRun, WorkflowRunStatus};

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for script runs, workflow runs, and node runs.
///
/// `update_*` methods only apply while the stored record is still pending or
/// running; updates against a terminal record are no-ops.
#[async_trait]
pub trait Store: Send + Sync {
  /// Create a new script run record.
  async fn create_script_run(&self, run: &ScriptRun) -> Result<(), Error>;

  /// Get a script run by ID.
  async fn get_script_run(&self, run_id: &str) -> Result<ScriptRun, Error>;

  /// Update a script run. No-op if the stored record is already terminal.
  async fn update_script_run(&self, run: &ScriptRun) -> Result<(), Error>;

  /// Delete a script run record.
  async fn delete_script_run(&self, run_id: &str) -> Result<(), Error>;

  /// Create a new workflow run record.
  async fn create_workflow_run(&self, run: &WorkflowRun) -> Result<(), Error>;

  /// Get a workflow run by ID.
  async fn get_workflow_run(&self, run_id: &str) -> Result<WorkflowRun, Error>;

  /// Update a workflow run. No-op if the stored record is already terminal.
  async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<(), Error>;

  /// Create a new node run record.
  async fn create_node_run(&self, node_run: &NodeRun) -> Result<(), Error>;

  /// Get a node run by ID.
  async fn get_node_run(&self, node_run_id: &str) -> Result<NodeRun, Error>;

  /// Update a node run. No-op if the stored record is already terminal.
  async fn update_node_run(&self, node_run: &NodeRun) -> Result<(), Error>;

  /// List node runs for a workflow run, oldest first.
  async fn list_node_runs(&self, workflow_run_id: &str) -> Result<Vec<NodeRun>, Error>;
}
