use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Error, NodeRun, ScriptRun, Store, WorkflowRun};

/// In-memory store implementation, useful for tests and embedding.
///
/// Applies the same monotonic update rule as the SQLite store: updates
/// against a record that already reached a terminal status are no-ops.
#[derive(Default)]
pub struct MemoryStore {
  script_runs: Mutex<HashMap<String, ScriptRun>>,
  workflow_runs: Mutex<HashMap<String, WorkflowRun>>,
  node_runs: Mutex<HashMap<String, NodeRun>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_script_run(&self, run: &ScriptRun) -> Result<(), Error> {
    let mut runs = self.script_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs.insert(run.run_id.clone(), run.clone());
    Ok(())
  }

  async fn get_script_run(&self, run_id: &str) -> Result<ScriptRun, Error> {
    let runs = self.script_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs
      .get(run_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }

  async fn update_script_run(&self, run: &ScriptRun) -> Result<(), Error> {
    let mut runs = self.script_runs.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = runs.get_mut(&run.run_id) {
      if !existing.status.is_terminal() {
        *existing = run.clone();
      }
    }
    Ok(())
  }

  async fn delete_script_run(&self, run_id: &str) -> Result<(), Error> {
    let mut runs = self.script_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs.remove(run_id);
    Ok(())
  }

  async fn create_workflow_run(&self, run: &WorkflowRun) -> Result<(), Error> {
    let mut runs = self.workflow_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs.insert(run.run_id.clone(), run.clone());
    Ok(())
  }

  async fn get_workflow_run(&self, run_id: &str) -> Result<WorkflowRun, Error> {
    let runs = self.workflow_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs
      .get(run_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }

  async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<(), Error> {
    let mut runs = self.workflow_runs.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = runs.get_mut(&run.run_id) {
      if !existing.status.is_terminal() {
        *existing = run.clone();
      }
    }
    Ok(())
  }

  async fn create_node_run(&self, node_run: &NodeRun) -> Result<(), Error> {
    let mut runs = self.node_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs.insert(node_run.node_run_id.clone(), node_run.clone());
    Ok(())
  }

  async fn get_node_run(&self, node_run_id: &str) -> Result<NodeRun, Error> {
    let runs = self.node_runs.lock().unwrap_or_else(|e| e.into_inner());
    runs
      .get(node_run_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(node_run_id.to_string()))
  }

  async fn update_node_run(&self, node_run: &NodeRun) -> Result<(), Error> {
    let mut runs = self.node_runs.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = runs.get_mut(&node_run.node_run_id) {
      if !existing.status.is_terminal() {
        *existing = node_run.clone();
      }
    }
    Ok(())
  }

  async fn list_node_runs(&self, workflow_run_id: &str) -> Result<Vec<NodeRun>, Error> {
    let runs = self.node_runs.lock().unwrap_or_else(|e| e.into_inner());
    let mut listed: Vec<NodeRun> = runs
      .values()
      .filter(|r| r.workflow_run_id == workflow_run_id)
      .cloned()
      .collect();
    listed.sort_by_key(|r| r.started_at);
    Ok(listed)
  }
}
