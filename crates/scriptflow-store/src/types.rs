use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Status of a standalone script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunStatus {
  Pending,
  Running,
  Success,
  Failed,
}

impl RunStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, RunStatus::Success | RunStatus::Failed)
  }
}

/// Status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
  Pending,
  Running,
  Success,
  Failed,
  Cancelled,
}

impl WorkflowRunStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      WorkflowRunStatus::Success | WorkflowRunStatus::Failed | WorkflowRunStatus::Cancelled
    )
  }
}

/// Status of a single node within a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NodeRunStatus {
  Pending,
  Running,
  Success,
  Failed,
  Skipped,
}

impl NodeRunStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      NodeRunStatus::Success | NodeRunStatus::Failed | NodeRunStatus::Skipped
    )
  }
}

/// A standalone script run as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScriptRun {
  pub run_id: String,
  pub script_id: String,
  pub status: RunStatus,
  pub parameters: Json<serde_json::Value>,
  pub output: Option<String>,
  pub error: Option<String>,
  pub log_path: Option<String>,
  pub exit_code: Option<i64>,
  pub created_at: DateTime<Utc>,
  pub started_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
}

/// A workflow run as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowRun {
  pub run_id: String,
  pub workflow_id: String,
  pub status: WorkflowRunStatus,
  pub parameters: Json<serde_json::Value>,
  pub error: Option<String>,
  pub created_at: DateTime<Utc>,
  pub started_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
}

/// A node execution within a workflow run as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NodeRun {
  pub node_run_id: String,
  pub workflow_run_id: String,
  pub node_id: String,
  pub status: NodeRunStatus,
  pub script_run_id: Option<String>,
  pub output: Option<Json<serde_json::Value>>,
  pub error: Option<String>,
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
}
