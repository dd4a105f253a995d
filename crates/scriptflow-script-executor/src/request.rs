use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scriptflow_config::Language;

/// A file uploaded alongside a run, materialized into the execution space
/// before the script starts.
#[derive(Debug, Clone)]
pub struct UploadedFile {
  pub name: String,
  pub contents: Vec<u8>,
}

/// Everything needed to run one script once.
#[derive(Debug, Clone)]
pub struct RunRequest {
  pub run_id: String,
  pub language: Language,
  pub source: String,
  pub dependencies: Vec<String>,
  /// Interpreter binary to invoke, already resolved for the run's
  /// environment.
  pub interpreter: PathBuf,
  /// Exposed to the script as environment variables.
  pub parameters: HashMap<String, String>,
  pub uploaded_files: Vec<UploadedFile>,
  /// Per-run deadline override. Falls back to the executor default.
  pub timeout: Option<Duration>,
}

/// How a script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
  Success,
  Failed,
}

/// The result of one script run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  pub status: ScriptStatus,
  /// Captured log contents on success, truncated to the output cap.
  pub output: Option<String>,
  /// Failure description on failure: the tail of the log, or a message
  /// describing why the process never produced one.
  pub error: Option<String>,
  pub exit_code: Option<i64>,
  pub log_path: PathBuf,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}
