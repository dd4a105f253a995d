use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scriptflow_config::Language;
use scriptflow_space::SpaceManager;
use tracing::{debug, instrument, warn};

use crate::error::ScriptError;
use crate::request::{RunOutcome, RunRequest, ScriptStatus};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_OUTPUT_CAP: usize = 10_000;
const DEFAULT_ERROR_TAIL_CAP: usize = 5_000;

/// Tuning knobs for the script executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
  /// Directory where per-run log files are written.
  pub logs_dir: PathBuf,
  /// Default deadline for a run. Individual requests may override it.
  pub timeout: Duration,
  /// Maximum characters of log content kept as a successful run's output.
  pub output_cap: usize,
  /// Maximum trailing characters of log content kept as a failed run's
  /// error.
  pub error_tail_cap: usize,
}

impl ExecutorConfig {
  pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
    Self {
      logs_dir: logs_dir.into(),
      timeout: DEFAULT_TIMEOUT,
      output_cap: DEFAULT_OUTPUT_CAP,
      error_tail_cap: DEFAULT_ERROR_TAIL_CAP,
    }
  }

  /// The log file a given run writes to.
  pub fn log_path(&self, run_id: &str) -> PathBuf {
    self.logs_dir.join(format!("run_{run_id}.log"))
  }
}

/// Runs scripts as child processes inside their execution spaces.
pub struct ScriptExecutor {
  config: ExecutorConfig,
  spaces: Arc<SpaceManager>,
}

impl ScriptExecutor {
  pub fn new(config: ExecutorConfig, spaces: Arc<SpaceManager>) -> Self {
    Self { config, spaces }
  }

  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  /// Run a script to completion.
  ///
  /// Returns `Err` only for setup failures before the process could be
  /// spawned. Spawn failures, non-zero exits, and deadline kills all come
  /// back as an `Ok` outcome with [`ScriptStatus::Failed`].
  #[instrument(
    name = "script_run",
    skip(self, request),
    fields(
      run_id = %request.run_id,
      language = %request.language,
    )
  )]
  pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, ScriptError> {
    let started_at = Utc::now();

    let space = self.spaces.acquire(&request.run_id)?;
    let script_path = self.materialize(request, &space)?;

    std::fs::create_dir_all(&self.config.logs_dir).map_err(|source| ScriptError::Io {
      path: self.config.logs_dir.clone(),
      source,
    })?;
    let log_path = self.config.log_path(&request.run_id);
    let mut log = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(&log_path)
      .map_err(|source| ScriptError::Io {
        path: log_path.clone(),
        source,
      })?;

    self.install_dependencies(request, &mut log).await;

    let file_names: Vec<&str> = request
      .uploaded_files
      .iter()
      .map(|f| f.name.as_str())
      .collect();

    let mut command = tokio::process::Command::new(&request.interpreter);
    command
      .arg(&script_path)
      .current_dir(&space)
      .envs(&request.parameters)
      .env(
        "SCRIPT_FILES",
        serde_json::to_string(&file_names).unwrap_or_default(),
      )
      .stdin(Stdio::null());

    // Both streams append to the same log file, interleaved as produced.
    match log.try_clone() {
      Ok(stdout_log) => {
        command.stdout(Stdio::from(stdout_log)).stderr(Stdio::from(log));
      }
      Err(source) => {
        return Err(ScriptError::Io {
          path: log_path,
          source,
        });
      }
    }

    let mut child = match command.spawn() {
      Ok(child) => child,
      Err(e) => {
        warn!(run_id = %request.run_id, error = %e, "failed to spawn interpreter");
        return Ok(self.failed(
          format!(
            "failed to spawn interpreter {}: {e}",
            request.interpreter.display()
          ),
          None,
          log_path,
          started_at,
        ));
      }
    };

    let timeout = request.timeout.unwrap_or(self.config.timeout);
    let exit = match tokio::time::timeout(timeout, child.wait()).await {
      Ok(Ok(status)) => status,
      Ok(Err(e)) => {
        return Ok(self.failed(
          format!("failed waiting for script process: {e}"),
          None,
          log_path,
          started_at,
        ));
      }
      Err(_) => {
        if let Err(e) = child.kill().await {
          warn!(run_id = %request.run_id, error = %e, "failed to kill overdue script");
        }
        return Ok(self.failed(
          format!("script exceeded deadline of {}s and was killed", timeout.as_secs()),
          None,
          log_path,
          started_at,
        ));
      }
    };

    let finished_at = Utc::now();
    let log_contents = std::fs::read(&log_path)
      .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
      .unwrap_or_default();

    let exit_code = exit.code().map(i64::from);
    if exit.success() {
      debug!(run_id = %request.run_id, "script completed");
      Ok(RunOutcome {
        status: ScriptStatus::Success,
        output: Some(truncate_front(&log_contents, self.config.output_cap)),
        error: None,
        exit_code,
        log_path,
        started_at,
        finished_at,
      })
    } else {
      let tail = truncate_tail(&log_contents, self.config.error_tail_cap);
      let error = if tail.is_empty() {
        format!("script exited with status {exit}")
      } else {
        tail
      };
      Ok(RunOutcome {
        status: ScriptStatus::Failed,
        output: None,
        error: Some(error),
        exit_code,
        log_path,
        started_at,
        finished_at,
      })
    }
  }

  /// Write uploaded files and the script source into the execution space.
  fn materialize(&self, request: &RunRequest, space: &Path) -> Result<PathBuf, ScriptError> {
    for file in &request.uploaded_files {
      let path = space.join(&file.name);
      std::fs::write(&path, &file.contents)
        .map_err(|source| ScriptError::Io { path, source })?;
    }

    let script_path = space.join(format!(
      "script_{}.{}",
      request.run_id,
      request.language.extension()
    ));
    std::fs::write(&script_path, &request.source).map_err(|source| ScriptError::Io {
      path: script_path.clone(),
      source,
    })?;

    Ok(script_path)
  }

  /// Install declared dependencies, appending installer output to the run
  /// log. Failures are logged and the run proceeds.
  async fn install_dependencies(&self, request: &RunRequest, log: &mut std::fs::File) {
    if request.dependencies.is_empty() {
      return;
    }

    let commands: Vec<tokio::process::Command> = match request.language {
      Language::Python => {
        let mut command = tokio::process::Command::new(&request.interpreter);
        command.args(["-m", "pip", "install"]).args(&request.dependencies);
        vec![command]
      }
      Language::Javascript => request
        .dependencies
        .iter()
        .map(|dep| {
          let mut command = tokio::process::Command::new("npm");
          command.args(["install", "-g", dep]);
          command
        })
        .collect(),
    };

    for mut command in commands {
      match command.output().await {
        Ok(output) => {
          let _ = log.write_all(&output.stdout);
          let _ = log.write_all(&output.stderr);
          if !output.status.success() {
            warn!(run_id = %request.run_id, status = %output.status, "dependency install failed");
          }
        }
        Err(e) => {
          warn!(run_id = %request.run_id, error = %e, "dependency install could not start");
          let _ = writeln!(log, "dependency install could not start: {e}");
        }
      }
    }
  }

  fn failed(
    &self,
    error: String,
    exit_code: Option<i64>,
    log_path: PathBuf,
    started_at: chrono::DateTime<Utc>,
  ) -> RunOutcome {
    RunOutcome {
      status: ScriptStatus::Failed,
      output: None,
      error: Some(error),
      exit_code,
      log_path,
      started_at,
      finished_at: Utc::now(),
    }
  }
}

/// Keep at most `cap` leading characters, respecting char boundaries.
fn truncate_front(s: &str, cap: usize) -> String {
  s.chars().take(cap).collect()
}

/// Keep at most `cap` trailing characters, respecting char boundaries.
fn truncate_tail(s: &str, cap: usize) -> String {
  let count = s.chars().count();
  if count <= cap {
    s.to_string()
  } else {
    s.chars().skip(count - cap).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_front_caps_length() {
    assert_eq!(truncate_front("hello", 3), "hel");
    assert_eq!(truncate_front("hi", 10), "hi");
  }

  #[test]
  fn truncate_tail_keeps_the_end() {
    assert_eq!(truncate_tail("hello", 3), "llo");
    assert_eq!(truncate_tail("hi", 10), "hi");
  }

  #[test]
  fn truncation_is_char_boundary_safe() {
    let s = "héllo wörld";
    assert_eq!(truncate_front(s, 2), "hé");
    assert_eq!(truncate_tail(s, 4), "örld");
  }

  #[test]
  fn log_path_uses_run_id() {
    let config = ExecutorConfig::new("/tmp/logs");
    assert_eq!(
      config.log_path("abc"),
      PathBuf::from("/tmp/logs/run_abc.log")
    );
  }
}
