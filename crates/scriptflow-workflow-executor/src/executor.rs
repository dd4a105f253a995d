//! Workflow scheduler implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scriptflow_config::{ConditionDef, NodeType};
use scriptflow_store::{Json, NodeRun, NodeRunStatus, RunStatus, Store, WorkflowRunStatus};
use scriptflow_workflow::{EdgeRef, Graph, Workflow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::{DispatchContext, ScriptDispatcher};
use crate::error::ExecutionError;
use crate::events::{NoopNotifier, RunEvent, RunNotifier};
use crate::expr;
use crate::result::{NodeOutcome, WorkflowOutcome};

/// The workflow scheduler.
///
/// Traverses the graph in queue order, applies edge conditions, dispatches
/// script nodes through the [`ScriptDispatcher`], and records node and run
/// state through the store.
pub struct WorkflowExecutor<N: RunNotifier = NoopNotifier> {
  store: Arc<dyn Store>,
  dispatcher: Arc<dyn ScriptDispatcher>,
  notifier: N,
}

impl WorkflowExecutor<NoopNotifier> {
  /// Create an executor without event observation.
  pub fn new(store: Arc<dyn Store>, dispatcher: Arc<dyn ScriptDispatcher>) -> Self {
    Self::with_notifier(store, dispatcher, NoopNotifier)
  }
}

impl<N: RunNotifier> WorkflowExecutor<N> {
  /// Create an executor that reports progress to the given notifier.
  pub fn with_notifier(
    store: Arc<dyn Store>,
    dispatcher: Arc<dyn ScriptDispatcher>,
    notifier: N,
  ) -> Self {
    Self {
      store,
      dispatcher,
      notifier,
    }
  }

  /// Execute a workflow run to a terminal status.
  ///
  /// The run record must already exist in the store with status pending.
  /// Business outcomes (failed script nodes, cancellation) come back as an
  /// `Ok` outcome; `Err` is reserved for structural problems and store
  /// failures.
  #[instrument(
    name = "workflow_execute",
    skip(self, workflow, parameters, cancel),
    fields(
      run_id = %run_id,
      workflow_id = %workflow.workflow_id,
    )
  )]
  pub async fn execute(
    &self,
    run_id: &str,
    workflow: &Workflow,
    parameters: &HashMap<String, String>,
    cancel: CancellationToken,
  ) -> Result<WorkflowOutcome, ExecutionError> {
    let graph = workflow.graph();
    let entry_points = graph.entry_points();
    if entry_points.is_empty() {
      let message = "workflow has no entry nodes".to_string();
      error!(run_id = %run_id, "workflow_rejected");
      self
        .finalize_run(run_id, WorkflowRunStatus::Failed, Some(message.clone()))
        .await?;
      return Err(ExecutionError::Structural { message });
    }

    self.mark_running(run_id).await?;
    info!(run_id = %run_id, workflow_id = %workflow.workflow_id, "workflow_started");
    self.notifier.notify(RunEvent::WorkflowStarted {
      run_id: run_id.to_string(),
      workflow_id: workflow.workflow_id.clone(),
    });

    let mut queue: VecDeque<String> = entry_points.iter().cloned().collect();
    let mut executed: HashMap<String, NodeOutcome> = HashMap::new();
    let mut run_error: Option<String> = None;

    while let Some(node_id) = queue.pop_front() {
      if executed.contains_key(&node_id) {
        continue;
      }

      if cancel.is_cancelled() {
        warn!(run_id = %run_id, "workflow_cancelled");
        self
          .finalize_run(run_id, WorkflowRunStatus::Cancelled, None)
          .await?;
        self.notifier.notify(RunEvent::WorkflowCancelled {
          run_id: run_id.to_string(),
        });
        return Ok(WorkflowOutcome {
          run_id: run_id.to_string(),
          status: WorkflowRunStatus::Cancelled,
          nodes: executed,
        });
      }

      let dependencies = graph.dependencies(&node_id);
      // Not ready yet. The node is dropped here and re-enqueued when its
      // remaining predecessors complete.
      if !dependencies
        .iter()
        .all(|edge| executed.contains_key(&edge.node_id))
      {
        continue;
      }

      if !dependencies.iter().all(|edge| edge_holds(edge, &executed)) {
        debug!(run_id = %run_id, node_id = %node_id, "node_skipped");
        self.record_skip(run_id, &node_id).await?;
        executed.insert(
          node_id.clone(),
          NodeOutcome {
            node_id: node_id.clone(),
            status: NodeRunStatus::Skipped,
            output: serde_json::Value::Null,
          },
        );
        self.notifier.notify(RunEvent::NodeSkipped {
          run_id: run_id.to_string(),
          node_id: node_id.clone(),
        });
        enqueue_ready_successors(&graph, &node_id, &executed, &mut queue);
        continue;
      }

      let Some(node) = workflow.get_node(&node_id) else {
        continue;
      };

      let mut node_run = NodeRun {
        node_run_id: uuid::Uuid::new_v4().to_string(),
        workflow_run_id: run_id.to_string(),
        node_id: node_id.clone(),
        status: NodeRunStatus::Running,
        script_run_id: None,
        output: None,
        error: None,
        started_at: Utc::now(),
        finished_at: None,
      };
      self.store.create_node_run(&node_run).await?;
      info!(run_id = %run_id, node_id = %node_id, "node_started");
      self.notifier.notify(RunEvent::NodeStarted {
        run_id: run_id.to_string(),
        node_id: node_id.clone(),
      });

      let (status, output, node_error) = match &node.node_type {
        NodeType::Script { script_id } => {
          let context = DispatchContext {
            workflow_run_id: run_id.to_string(),
            node_id: node_id.clone(),
            script_id: script_id.clone(),
            parameters: parameters.clone(),
          };
          match self.dispatcher.dispatch(context).await {
            Ok(outcome) => {
              node_run.script_run_id = Some(outcome.script_run_id.clone());
              let status = match outcome.status {
                RunStatus::Success => NodeRunStatus::Success,
                _ => NodeRunStatus::Failed,
              };
              let output = serde_json::json!({
                "script_run_id": outcome.script_run_id,
                "status": outcome.status,
                "output": outcome.output,
              });
              (status, output, outcome.error)
            }
            Err(e) => (
              NodeRunStatus::Failed,
              serde_json::Value::Null,
              Some(e.to_string()),
            ),
          }
        }
        NodeType::Delay { delay_seconds } => {
          tokio::time::sleep(Duration::from_secs(*delay_seconds)).await;
          (
            NodeRunStatus::Success,
            serde_json::json!({ "delayed_seconds": delay_seconds }),
            None,
          )
        }
        NodeType::Condition { expression } => {
          let context = output_context(&executed);
          let result = match expr::evaluate(expression, &context) {
            Ok(result) => result,
            Err(e) => {
              debug!(run_id = %run_id, node_id = %node_id, error = %e, "condition_expression_invalid");
              false
            }
          };
          (
            NodeRunStatus::Success,
            serde_json::Value::Bool(result),
            None,
          )
        }
      };

      node_run.status = status;
      node_run.output = Some(Json(output.clone()));
      node_run.error = node_error.clone();
      node_run.finished_at = Some(Utc::now());
      self.store.update_node_run(&node_run).await?;

      match status {
        NodeRunStatus::Failed => {
          let message = node_error.unwrap_or_else(|| "node failed".to_string());
          error!(run_id = %run_id, node_id = %node_id, error = %message, "node_failed");
          self.notifier.notify(RunEvent::NodeFailed {
            run_id: run_id.to_string(),
            node_id: node_id.clone(),
            error: message.clone(),
          });
          if run_error.is_none() {
            run_error = Some(format!("node '{node_id}' failed: {message}"));
          }
        }
        _ => {
          info!(run_id = %run_id, node_id = %node_id, "node_completed");
          self.notifier.notify(RunEvent::NodeCompleted {
            run_id: run_id.to_string(),
            node_id: node_id.clone(),
            output: output.clone(),
          });
        }
      }

      executed.insert(
        node_id.clone(),
        NodeOutcome {
          node_id: node_id.clone(),
          status,
          output,
        },
      );
      enqueue_ready_successors(&graph, &node_id, &executed, &mut queue);
    }

    let status = if let Some(message) = run_error {
      error!(run_id = %run_id, error = %message, "workflow_failed");
      self
        .finalize_run(run_id, WorkflowRunStatus::Failed, Some(message.clone()))
        .await?;
      self.notifier.notify(RunEvent::WorkflowFailed {
        run_id: run_id.to_string(),
        error: message,
      });
      WorkflowRunStatus::Failed
    } else {
      info!(run_id = %run_id, "workflow_completed");
      self
        .finalize_run(run_id, WorkflowRunStatus::Success, None)
        .await?;
      self.notifier.notify(RunEvent::WorkflowCompleted {
        run_id: run_id.to_string(),
      });
      WorkflowRunStatus::Success
    };

    Ok(WorkflowOutcome {
      run_id: run_id.to_string(),
      status,
      nodes: executed,
    })
  }

  async fn mark_running(&self, run_id: &str) -> Result<(), ExecutionError> {
    let mut run = self.store.get_workflow_run(run_id).await?;
    run.status = WorkflowRunStatus::Running;
    run.started_at = Some(Utc::now());
    self.store.update_workflow_run(&run).await?;
    Ok(())
  }

  async fn finalize_run(
    &self,
    run_id: &str,
    status: WorkflowRunStatus,
    error: Option<String>,
  ) -> Result<(), ExecutionError> {
    let mut run = self.store.get_workflow_run(run_id).await?;
    run.status = status;
    run.error = error;
    run.finished_at = Some(Utc::now());
    self.store.update_workflow_run(&run).await?;
    Ok(())
  }

  async fn record_skip(&self, run_id: &str, node_id: &str) -> Result<(), ExecutionError> {
    let now = Utc::now();
    let node_run = NodeRun {
      node_run_id: uuid::Uuid::new_v4().to_string(),
      workflow_run_id: run_id.to_string(),
      node_id: node_id.to_string(),
      status: NodeRunStatus::Skipped,
      script_run_id: None,
      output: None,
      error: None,
      started_at: now,
      finished_at: Some(now),
    };
    self.store.create_node_run(&node_run).await?;
    Ok(())
  }
}

/// Whether a dependency edge permits the downstream node to run.
///
/// An edge without a condition requires its predecessor to have succeeded,
/// so failures and skips cascade down plain chains.
fn edge_holds(edge: &EdgeRef, executed: &HashMap<String, NodeOutcome>) -> bool {
  match &edge.condition {
    None => node_has_status(executed, &edge.node_id, NodeRunStatus::Success),
    Some(condition) => condition_met(condition, executed),
  }
}

fn condition_met(condition: &ConditionDef, executed: &HashMap<String, NodeOutcome>) -> bool {
  match condition {
    ConditionDef::Success { node_id } => {
      node_has_status(executed, node_id, NodeRunStatus::Success)
    }
    ConditionDef::Failed { node_id } => node_has_status(executed, node_id, NodeRunStatus::Failed),
    ConditionDef::Expression { expression } => {
      let context = output_context(executed);
      match expr::evaluate(expression, &context) {
        Ok(result) => result,
        Err(e) => {
          debug!(error = %e, "edge_expression_invalid");
          false
        }
      }
    }
  }
}

fn node_has_status(
  executed: &HashMap<String, NodeOutcome>,
  node_id: &str,
  status: NodeRunStatus,
) -> bool {
  executed.get(node_id).is_some_and(|o| o.status == status)
}

/// Read-only expression context: node id -> { status, output }.
fn output_context(executed: &HashMap<String, NodeOutcome>) -> serde_json::Value {
  let entries = executed
    .iter()
    .map(|(id, outcome)| {
      (
        id.clone(),
        serde_json::json!({
          "status": outcome.status,
          "output": outcome.output,
        }),
      )
    })
    .collect();
  serde_json::Value::Object(entries)
}

/// Offer each successor of a finished node; enqueue only the ones whose
/// dependencies are all in the executed set.
fn enqueue_ready_successors(
  graph: &Graph,
  node_id: &str,
  executed: &HashMap<String, NodeOutcome>,
  queue: &mut VecDeque<String>,
) {
  for successor in graph.successors(node_id) {
    if executed.contains_key(&successor.node_id) {
      continue;
    }
    let ready = graph
      .dependencies(&successor.node_id)
      .iter()
      .all(|edge| executed.contains_key(&edge.node_id));
    if ready {
      queue.push_back(successor.node_id.clone());
    }
  }
}
