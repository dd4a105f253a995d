use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use scriptflow_registry::{ScriptRepository, WorkflowRepository};
use scriptflow_script_executor::UploadedFile;
use scriptflow_space::SpaceManager;
use scriptflow_store::{Json, Store, WorkflowRun, WorkflowRunStatus};
use scriptflow_workflow::Workflow;
use scriptflow_workflow_executor::{NoopNotifier, RunNotifier, WorkflowExecutor};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dispatch::ProcessDispatcher;
use crate::error::ServiceError;

/// A snapshot of a run's log sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTail {
  pub content: String,
  /// True once the run reached a terminal status; the content will no
  /// longer grow.
  pub done: bool,
}

/// The run submission facade.
///
/// Submissions are fire-and-forget: each run executes on its own spawned
/// task and callers poll the store or tail the log. Cancellation tokens for
/// in-flight workflow runs are tracked here so `cancel_workflow_run` can
/// reach them.
pub struct RunService<N: RunNotifier + 'static = NoopNotifier> {
  store: Arc<dyn Store>,
  scripts: Arc<dyn ScriptRepository>,
  workflows: Arc<dyn WorkflowRepository>,
  spaces: Arc<SpaceManager>,
  dispatcher: Arc<ProcessDispatcher>,
  workflow_executor: Arc<WorkflowExecutor<N>>,
  active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl<N: RunNotifier + 'static> RunService<N> {
  pub fn new(
    store: Arc<dyn Store>,
    scripts: Arc<dyn ScriptRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    spaces: Arc<SpaceManager>,
    dispatcher: Arc<ProcessDispatcher>,
    workflow_executor: Arc<WorkflowExecutor<N>>,
  ) -> Self {
    Self {
      store,
      scripts,
      workflows,
      spaces,
      dispatcher,
      workflow_executor,
      active: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Submit a standalone script run. Returns the run id immediately; the
  /// run executes in the background.
  pub async fn submit_script_run(
    &self,
    script_id: &str,
    parameters: HashMap<String, String>,
    uploaded_files: Vec<UploadedFile>,
  ) -> Result<String, ServiceError> {
    let script =
      self
        .scripts
        .get_script(script_id)
        .await
        .ok_or_else(|| ServiceError::ScriptNotFound {
          script_id: script_id.to_string(),
        })?;

    let run = self.dispatcher.create_run(&script, &parameters).await?;
    let run_id = run.run_id.clone();
    info!(run_id = %run_id, script_id = %script_id, "script_run_submitted");

    let dispatcher = self.dispatcher.clone();
    tokio::spawn(async move {
      if let Err(e) = dispatcher
        .run_to_completion(run, &script, parameters, uploaded_files)
        .await
      {
        error!(error = %e, "script run could not be recorded");
      }
    });

    Ok(run_id)
  }

  /// Submit a workflow run. Returns the run id immediately; the run
  /// executes in the background.
  pub async fn submit_workflow_run(
    &self,
    workflow_id: &str,
    parameters: HashMap<String, String>,
  ) -> Result<String, ServiceError> {
    let def = self.workflows.get_workflow(workflow_id).await.ok_or_else(|| {
      ServiceError::WorkflowNotFound {
        workflow_id: workflow_id.to_string(),
      }
    })?;
    let workflow = Workflow::from_def(def)?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let run = WorkflowRun {
      run_id: run_id.clone(),
      workflow_id: workflow_id.to_string(),
      status: WorkflowRunStatus::Pending,
      parameters: Json(serde_json::to_value(&parameters).unwrap_or_default()),
      error: None,
      created_at: chrono::Utc::now(),
      started_at: None,
      finished_at: None,
    };
    self.store.create_workflow_run(&run).await?;
    info!(run_id = %run_id, workflow_id = %workflow_id, "workflow_run_submitted");

    let cancel = CancellationToken::new();
    {
      let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
      active.insert(run_id.clone(), cancel.clone());
    }

    let executor = self.workflow_executor.clone();
    let active = self.active.clone();
    let task_run_id = run_id.clone();
    tokio::spawn(async move {
      if let Err(e) = executor
        .execute(&task_run_id, &workflow, &parameters, cancel)
        .await
      {
        error!(run_id = %task_run_id, error = %e, "workflow run aborted");
      }
      let mut active = active.lock().unwrap_or_else(|e| e.into_inner());
      active.remove(&task_run_id);
    });

    Ok(run_id)
  }

  /// Request cooperative cancellation of a workflow run. Takes effect
  /// between node dispatches; an in-flight script node runs to completion.
  /// Cancelling an already finished run is a no-op.
  pub async fn cancel_workflow_run(&self, run_id: &str) -> Result<(), ServiceError> {
    let token = {
      let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
      active.get(run_id).cloned()
    };
    match token {
      Some(token) => {
        info!(run_id = %run_id, "workflow_run_cancel_requested");
        token.cancel();
        Ok(())
      }
      None => {
        // Not in flight. Surface NotFound for unknown ids, no-op otherwise.
        self.store.get_workflow_run(run_id).await?;
        Ok(())
      }
    }
  }

  /// Read the current contents of a script run's log.
  pub async fn tail_log(&self, run_id: &str) -> Result<LogTail, ServiceError> {
    let run = self.store.get_script_run(run_id).await?;
    let content = run
      .log_path
      .as_deref()
      .and_then(|path| std::fs::read_to_string(path).ok())
      .or(run.output)
      .unwrap_or_default();
    Ok(LogTail {
      content,
      done: run.status.is_terminal(),
    })
  }

  /// Delete a script run record together with its log file and execution
  /// space. Cleanup failures are logged and do not block record deletion.
  pub async fn delete_script_run(&self, run_id: &str) -> Result<(), ServiceError> {
    let run = self.store.get_script_run(run_id).await?;

    if let Some(log_path) = run.log_path.as_deref() {
      if let Err(e) = std::fs::remove_file(log_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
          warn!(run_id = %run_id, error = %e, "failed to remove run log");
        }
      }
    }
    if let Err(e) = self.spaces.release(run_id) {
      warn!(run_id = %run_id, error = %e, "failed to release execution space");
    }

    self.store.delete_script_run(run_id).await?;
    info!(run_id = %run_id, "script_run_deleted");
    Ok(())
  }
}
