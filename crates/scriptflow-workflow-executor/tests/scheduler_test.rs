use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use scriptflow_config::{ConditionDef, EdgeDef, NodeDef, NodeType, WorkflowDef};
use scriptflow_store::{
  Json, MemoryStore, NodeRunStatus, RunStatus, Store, WorkflowRun, WorkflowRunStatus,
};
use scriptflow_workflow::Workflow;
use scriptflow_workflow_executor::{
  DispatchContext, DispatchError, ExecutionError, ScriptDispatcher, ScriptNodeOutcome,
  WorkflowExecutor,
};
use tokio_util::sync::CancellationToken;

/// Dispatcher stub: every script succeeds unless its id is in `fail`.
#[derive(Default)]
struct StubDispatcher {
  fail: HashSet<String>,
  calls: Mutex<Vec<String>>,
}

impl StubDispatcher {
  fn failing(script_ids: &[&str]) -> Self {
    Self {
      fail: script_ids.iter().map(|s| s.to_string()).collect(),
      calls: Mutex::new(Vec::new()),
    }
  }

  fn dispatched_nodes(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl ScriptDispatcher for StubDispatcher {
  async fn dispatch(&self, context: DispatchContext) -> Result<ScriptNodeOutcome, DispatchError> {
    self.calls.lock().unwrap().push(context.node_id.clone());
    let script_run_id = uuid::Uuid::new_v4().to_string();
    if self.fail.contains(&context.script_id) {
      Ok(ScriptNodeOutcome {
        script_run_id,
        status: RunStatus::Failed,
        output: None,
        error: Some("script exited with status 1".to_string()),
      })
    } else {
      Ok(ScriptNodeOutcome {
        script_run_id,
        status: RunStatus::Success,
        output: Some("ok".to_string()),
        error: None,
      })
    }
  }
}

fn script_node(id: &str) -> NodeDef {
  NodeDef {
    node_id: id.to_string(),
    node_type: NodeType::Script {
      script_id: format!("{id}-script"),
    },
  }
}

fn edge(source: &str, target: &str) -> EdgeDef {
  EdgeDef {
    source: source.to_string(),
    target: target.to_string(),
    condition: None,
  }
}

fn cond_edge(source: &str, target: &str, condition: ConditionDef) -> EdgeDef {
  EdgeDef {
    source: source.to_string(),
    target: target.to_string(),
    condition: Some(condition),
  }
}

fn workflow(nodes: Vec<NodeDef>, edges: Vec<EdgeDef>) -> Workflow {
  Workflow::from_def(WorkflowDef {
    workflow_id: "wf1".to_string(),
    name: "test workflow".to_string(),
    nodes,
    edges,
  })
  .unwrap()
}

async fn seed_run(store: &MemoryStore, run_id: &str) {
  let run = WorkflowRun {
    run_id: run_id.to_string(),
    workflow_id: "wf1".to_string(),
    status: WorkflowRunStatus::Pending,
    parameters: Json(serde_json::Value::Null),
    error: None,
    created_at: Utc::now(),
    started_at: None,
    finished_at: None,
  };
  store.create_workflow_run(&run).await.unwrap();
}

struct Harness {
  store: Arc<MemoryStore>,
  dispatcher: Arc<StubDispatcher>,
  executor: WorkflowExecutor,
}

fn harness(dispatcher: StubDispatcher) -> Harness {
  let store = Arc::new(MemoryStore::new());
  let dispatcher = Arc::new(dispatcher);
  let executor = WorkflowExecutor::new(store.clone(), dispatcher.clone());
  Harness {
    store,
    dispatcher,
    executor,
  }
}

#[tokio::test]
async fn chain_executes_in_order() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![script_node("a"), script_node("b"), script_node("c")],
    vec![edge("a", "b"), edge("b", "c")],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, WorkflowRunStatus::Success);
  assert_eq!(h.dispatcher.dispatched_nodes(), ["a", "b", "c"]);
  for id in ["a", "b", "c"] {
    assert_eq!(outcome.nodes[id].status, NodeRunStatus::Success);
  }

  let node_runs = h.store.list_node_runs("run1").await.unwrap();
  assert_eq!(node_runs.len(), 3);
  assert_eq!(node_runs[0].node_id, "a");
  assert_eq!(node_runs[2].node_id, "c");
  assert!(node_runs.iter().all(|r| r.finished_at.is_some()));

  let run = h.store.get_workflow_run("run1").await.unwrap();
  assert_eq!(run.status, WorkflowRunStatus::Success);
  assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn failed_predecessor_routes_by_condition() {
  let h = harness(StubDispatcher::failing(&["a-script"]));
  let wf = workflow(
    vec![script_node("a"), script_node("b"), script_node("c")],
    vec![
      cond_edge(
        "a",
        "b",
        ConditionDef::Success {
          node_id: "a".to_string(),
        },
      ),
      cond_edge(
        "a",
        "c",
        ConditionDef::Failed {
          node_id: "a".to_string(),
        },
      ),
    ],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.nodes["a"].status, NodeRunStatus::Failed);
  assert_eq!(outcome.nodes["b"].status, NodeRunStatus::Skipped);
  assert_eq!(outcome.nodes["c"].status, NodeRunStatus::Success);
  assert_eq!(outcome.status, WorkflowRunStatus::Failed);

  let run = h.store.get_workflow_run("run1").await.unwrap();
  assert_eq!(run.status, WorkflowRunStatus::Failed);
  assert!(run.error.unwrap().contains("'a'"));
}

#[tokio::test]
async fn failure_cascades_down_a_plain_chain() {
  let h = harness(StubDispatcher::failing(&["a-script"]));
  let wf = workflow(
    vec![script_node("a"), script_node("b"), script_node("c")],
    vec![edge("a", "b"), edge("b", "c")],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, WorkflowRunStatus::Failed);
  assert_eq!(outcome.nodes["b"].status, NodeRunStatus::Skipped);
  assert_eq!(outcome.nodes["c"].status, NodeRunStatus::Skipped);
  // Only the failing node ever reached the dispatcher.
  assert_eq!(h.dispatcher.dispatched_nodes(), ["a"]);
}

#[tokio::test]
async fn skip_cascade_reaches_every_descendant() {
  let h = harness(StubDispatcher::failing(&["a-script"]));
  let wf = workflow(
    vec![
      script_node("a"),
      script_node("b"),
      script_node("c"),
      script_node("d"),
    ],
    vec![
      cond_edge(
        "a",
        "b",
        ConditionDef::Success {
          node_id: "a".to_string(),
        },
      ),
      edge("b", "c"),
      edge("c", "d"),
    ],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  for id in ["b", "c", "d"] {
    assert_eq!(outcome.nodes[id].status, NodeRunStatus::Skipped, "node {id}");
  }
  let node_runs = h.store.list_node_runs("run1").await.unwrap();
  let skipped = node_runs
    .iter()
    .filter(|r| r.status == NodeRunStatus::Skipped)
    .count();
  assert_eq!(skipped, 3);
}

#[tokio::test]
async fn independent_entry_nodes_each_run_once() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![script_node("a"), script_node("b"), script_node("c")],
    vec![edge("a", "c"), edge("b", "c")],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, WorkflowRunStatus::Success);
  let mut dispatched = h.dispatcher.dispatched_nodes();
  let join_position = dispatched.iter().position(|n| n == "c").unwrap();
  assert_eq!(join_position, 2, "join node must run after both entries");
  dispatched.sort();
  assert_eq!(dispatched, ["a", "b", "c"]);
}

#[tokio::test]
async fn cycle_nodes_are_never_executed() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![script_node("a"), script_node("b"), script_node("c")],
    vec![edge("b", "c"), edge("c", "b")],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(h.dispatcher.dispatched_nodes(), ["a"]);
  assert!(!outcome.nodes.contains_key("b"));
  assert!(!outcome.nodes.contains_key("c"));
}

#[tokio::test]
async fn no_entry_nodes_is_a_structural_error() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![script_node("a"), script_node("b")],
    vec![edge("a", "b"), edge("b", "a")],
  );
  seed_run(&h.store, "run1").await;

  let err = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, ExecutionError::Structural { .. }));
  assert!(h.dispatcher.dispatched_nodes().is_empty());
  let run = h.store.get_workflow_run("run1").await.unwrap();
  assert_eq!(run.status, WorkflowRunStatus::Failed);
  assert!(run.error.unwrap().contains("entry"));
}

#[tokio::test]
async fn cancelled_run_stops_before_dispatch() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(vec![script_node("a")], vec![]);
  seed_run(&h.store, "run1").await;

  let cancel = CancellationToken::new();
  cancel.cancel();
  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), cancel)
    .await
    .unwrap();

  assert_eq!(outcome.status, WorkflowRunStatus::Cancelled);
  assert!(h.dispatcher.dispatched_nodes().is_empty());
  let run = h.store.get_workflow_run("run1").await.unwrap();
  assert_eq!(run.status, WorkflowRunStatus::Cancelled);
}

#[tokio::test]
async fn expression_edges_read_prior_outputs() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![script_node("a"), script_node("b"), script_node("c")],
    vec![
      cond_edge(
        "a",
        "b",
        ConditionDef::Expression {
          expression: "a.status == 'success'".to_string(),
        },
      ),
      cond_edge(
        "a",
        "c",
        ConditionDef::Expression {
          expression: "a.status == 'failed'".to_string(),
        },
      ),
    ],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.nodes["b"].status, NodeRunStatus::Success);
  assert_eq!(outcome.nodes["c"].status, NodeRunStatus::Skipped);
}

#[tokio::test]
async fn invalid_expression_skips_instead_of_failing() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![script_node("a"), script_node("b")],
    vec![cond_edge(
      "a",
      "b",
      ConditionDef::Expression {
        expression: "not a valid ?? expression".to_string(),
      },
    )],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, WorkflowRunStatus::Success);
  assert_eq!(outcome.nodes["b"].status, NodeRunStatus::Skipped);
}

#[tokio::test]
async fn delay_and_condition_nodes_record_outputs() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(
    vec![
      NodeDef {
        node_id: "wait".to_string(),
        node_type: NodeType::Delay { delay_seconds: 0 },
      },
      NodeDef {
        node_id: "check".to_string(),
        node_type: NodeType::Condition {
          expression: "wait.status == 'success'".to_string(),
        },
      },
    ],
    vec![edge("wait", "check")],
  );
  seed_run(&h.store, "run1").await;

  let outcome = h
    .executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(outcome.status, WorkflowRunStatus::Success);
  assert_eq!(outcome.nodes["wait"].output["delayed_seconds"], 0);
  assert_eq!(outcome.nodes["check"].output, serde_json::Value::Bool(true));
}

#[tokio::test]
async fn script_node_records_its_script_run_id() {
  let h = harness(StubDispatcher::default());
  let wf = workflow(vec![script_node("a")], vec![]);
  seed_run(&h.store, "run1").await;

  h.executor
    .execute("run1", &wf, &HashMap::new(), CancellationToken::new())
    .await
    .unwrap();

  let node_runs = h.store.list_node_runs("run1").await.unwrap();
  assert_eq!(node_runs.len(), 1);
  assert!(node_runs[0].script_run_id.is_some());
  let output = node_runs[0].output.as_ref().unwrap();
  assert_eq!(output.0["status"], "success");
}
