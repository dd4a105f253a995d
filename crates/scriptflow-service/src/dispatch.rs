use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scriptflow_config::ScriptDef;
use scriptflow_registry::{InterpreterRegistry, ScriptRepository};
use scriptflow_script_executor::{RunRequest, ScriptExecutor, ScriptStatus, UploadedFile};
use scriptflow_store::{Json, RunStatus, ScriptRun, Store};
use scriptflow_workflow_executor::{
  DispatchContext, DispatchError, ScriptDispatcher, ScriptNodeOutcome,
};
use tracing::instrument;

/// The production [`ScriptDispatcher`]: runs scripts as interpreter
/// processes via the script executor and records each run in the store.
///
/// Both standalone script runs and workflow script nodes flow through here,
/// so a node's run record is indistinguishable from a standalone one.
pub struct ProcessDispatcher {
  store: Arc<dyn Store>,
  scripts: Arc<dyn ScriptRepository>,
  interpreters: Arc<dyn InterpreterRegistry>,
  executor: Arc<ScriptExecutor>,
}

impl ProcessDispatcher {
  pub fn new(
    store: Arc<dyn Store>,
    scripts: Arc<dyn ScriptRepository>,
    interpreters: Arc<dyn InterpreterRegistry>,
    executor: Arc<ScriptExecutor>,
  ) -> Self {
    Self {
      store,
      scripts,
      interpreters,
      executor,
    }
  }

  /// Create the pending run record for one script invocation. The log path
  /// is recorded up front so a tailing reader can attach before the process
  /// writes anything.
  pub async fn create_run(
    &self,
    script: &ScriptDef,
    parameters: &HashMap<String, String>,
  ) -> Result<ScriptRun, scriptflow_store::Error> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let log_path = self.executor.config().log_path(&run_id);
    let run = ScriptRun {
      run_id,
      script_id: script.script_id.clone(),
      status: RunStatus::Pending,
      parameters: Json(serde_json::to_value(parameters).unwrap_or_default()),
      output: None,
      error: None,
      log_path: Some(log_path.to_string_lossy().into_owned()),
      exit_code: None,
      created_at: Utc::now(),
      started_at: None,
      finished_at: None,
    };
    self.store.create_script_run(&run).await?;
    Ok(run)
  }

  /// Drive a created run to its terminal status and return the finalized
  /// record.
  #[instrument(
    name = "script_dispatch",
    skip(self, run, script, parameters, uploaded_files),
    fields(
      run_id = %run.run_id,
      script_id = %script.script_id,
    )
  )]
  pub async fn run_to_completion(
    &self,
    mut run: ScriptRun,
    script: &ScriptDef,
    parameters: HashMap<String, String>,
    uploaded_files: Vec<UploadedFile>,
  ) -> Result<ScriptRun, scriptflow_store::Error> {
    run.status = RunStatus::Running;
    run.started_at = Some(Utc::now());
    self.store.update_script_run(&run).await?;

    let request = RunRequest {
      run_id: run.run_id.clone(),
      language: script.language,
      source: script.source.clone(),
      dependencies: script.dependencies.clone(),
      interpreter: self
        .interpreters
        .resolve_interpreter(script.language, script.environment_id.as_deref()),
      parameters,
      uploaded_files,
      timeout: None,
    };

    match self.executor.run(&request).await {
      Ok(outcome) => {
        run.status = match outcome.status {
          ScriptStatus::Success => RunStatus::Success,
          ScriptStatus::Failed => RunStatus::Failed,
        };
        run.output = outcome.output;
        run.error = outcome.error;
        run.exit_code = outcome.exit_code;
        run.finished_at = Some(outcome.finished_at);
      }
      Err(e) => {
        run.status = RunStatus::Failed;
        run.error = Some(e.to_string());
        run.finished_at = Some(Utc::now());
      }
    }
    self.store.update_script_run(&run).await?;
    Ok(run)
  }
}

#[async_trait]
impl ScriptDispatcher for ProcessDispatcher {
  async fn dispatch(&self, context: DispatchContext) -> Result<ScriptNodeOutcome, DispatchError> {
    let script = self
      .scripts
      .get_script(&context.script_id)
      .await
      .ok_or_else(|| DispatchError::ScriptNotFound {
        script_id: context.script_id.clone(),
      })?;

    let run = self
      .create_run(&script, &context.parameters)
      .await
      .map_err(|e| DispatchError::Internal {
        message: e.to_string(),
      })?;
    let run = self
      .run_to_completion(run, &script, context.parameters, vec![])
      .await
      .map_err(|e| DispatchError::Internal {
        message: e.to_string(),
      })?;

    Ok(ScriptNodeOutcome {
      script_run_id: run.run_id,
      status: run.status,
      output: run.output,
      error: run.error,
    })
  }
}
