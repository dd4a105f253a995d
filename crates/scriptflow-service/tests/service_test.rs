#![cfg(unix)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scriptflow_config::{EdgeDef, Language, NodeDef, NodeType, ScriptDef, WorkflowDef};
use scriptflow_registry::{InMemoryScripts, InMemoryWorkflows, InterpreterTable};
use scriptflow_script_executor::{ExecutorConfig, ScriptExecutor};
use scriptflow_service::{ProcessDispatcher, RunService, ServiceError};
use scriptflow_space::SpaceManager;
use scriptflow_store::{MemoryStore, RunStatus, Store, WorkflowRunStatus};
use scriptflow_workflow_executor::WorkflowExecutor;

fn shell_script(script_id: &str, source: &str) -> ScriptDef {
  ScriptDef {
    script_id: script_id.to_string(),
    name: script_id.to_string(),
    language: Language::Python,
    source: source.to_string(),
    dependencies: vec![],
    parameters: vec![],
    environment_id: None,
  }
}

struct Harness {
  service: RunService,
  store: Arc<MemoryStore>,
  _root: tempfile::TempDir,
}

fn harness(scripts: Vec<ScriptDef>, workflows: Vec<WorkflowDef>) -> Harness {
  let root = tempfile::tempdir().unwrap();
  let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

  let mut script_repo = InMemoryScripts::new();
  for script in scripts {
    script_repo.insert(script);
  }
  let script_repo = Arc::new(script_repo);

  let mut workflow_repo = InMemoryWorkflows::new();
  for workflow in workflows {
    workflow_repo.insert(workflow);
  }

  // Scripts are plain shell for test purposes.
  let mut interpreters = InterpreterTable::new();
  interpreters.set_default(Language::Python, "/bin/sh");

  let spaces = Arc::new(SpaceManager::new(root.path().join("spaces")));
  let executor = Arc::new(ScriptExecutor::new(
    ExecutorConfig::new(root.path().join("logs")),
    spaces.clone(),
  ));
  let dispatcher = Arc::new(ProcessDispatcher::new(
    store.clone(),
    script_repo.clone(),
    Arc::new(interpreters),
    executor,
  ));
  let workflow_executor = Arc::new(WorkflowExecutor::new(store.clone(), dispatcher.clone()));

  Harness {
    service: RunService::new(
      store.clone(),
      script_repo,
      Arc::new(workflow_repo),
      spaces,
      dispatcher,
      workflow_executor,
    ),
    store,
    _root: root,
  }
}

async fn wait_for_script_run(store: &MemoryStore, run_id: &str) -> scriptflow_store::ScriptRun {
  for _ in 0..200 {
    let run = store.get_script_run(run_id).await.unwrap();
    if run.status.is_terminal() {
      return run;
    }
    tokio::time::sleep(Duration::from_millis(25)).await;
  }
  panic!("script run {run_id} did not finish in time");
}

async fn wait_for_workflow_run(
  store: &MemoryStore,
  run_id: &str,
) -> scriptflow_store::WorkflowRun {
  for _ in 0..200 {
    let run = store.get_workflow_run(run_id).await.unwrap();
    if run.status.is_terminal() {
      return run;
    }
    tokio::time::sleep(Duration::from_millis(25)).await;
  }
  panic!("workflow run {run_id} did not finish in time");
}

#[tokio::test]
async fn submitted_script_run_reaches_success() {
  let h = harness(vec![shell_script("hello", "echo hello")], vec![]);

  let run_id = h
    .service
    .submit_script_run("hello", HashMap::new(), vec![])
    .await
    .unwrap();

  let run = wait_for_script_run(&h.store, &run_id).await;
  assert_eq!(run.status, RunStatus::Success);
  assert_eq!(run.output.as_deref(), Some("hello\n"));
  assert_eq!(run.exit_code, Some(0));
}

#[tokio::test]
async fn unknown_script_is_rejected_up_front() {
  let h = harness(vec![], vec![]);
  let err = h
    .service
    .submit_script_run("ghost", HashMap::new(), vec![])
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::ScriptNotFound { .. }));
}

#[tokio::test]
async fn workflow_run_executes_its_script_nodes() {
  let workflow = WorkflowDef {
    workflow_id: "wf1".to_string(),
    name: "two step".to_string(),
    nodes: vec![
      NodeDef {
        node_id: "first".to_string(),
        node_type: NodeType::Script {
          script_id: "step".to_string(),
        },
      },
      NodeDef {
        node_id: "second".to_string(),
        node_type: NodeType::Script {
          script_id: "step".to_string(),
        },
      },
    ],
    edges: vec![EdgeDef {
      source: "first".to_string(),
      target: "second".to_string(),
      condition: None,
    }],
  };
  let h = harness(vec![shell_script("step", "echo step")], vec![workflow]);

  let run_id = h
    .service
    .submit_workflow_run("wf1", HashMap::new())
    .await
    .unwrap();

  let run = wait_for_workflow_run(&h.store, &run_id).await;
  assert_eq!(run.status, WorkflowRunStatus::Success);

  let node_runs = h.store.list_node_runs(&run_id).await.unwrap();
  assert_eq!(node_runs.len(), 2);
  assert!(node_runs.iter().all(|r| r.script_run_id.is_some()));
}

#[tokio::test]
async fn tail_log_reports_done_after_completion() {
  let h = harness(vec![shell_script("hello", "echo tailed")], vec![]);
  let run_id = h
    .service
    .submit_script_run("hello", HashMap::new(), vec![])
    .await
    .unwrap();
  wait_for_script_run(&h.store, &run_id).await;

  let tail = h.service.tail_log(&run_id).await.unwrap();
  assert!(tail.done);
  assert_eq!(tail.content, "tailed\n");
}

#[tokio::test]
async fn delete_script_run_removes_record_and_log() {
  let h = harness(vec![shell_script("hello", "echo bye")], vec![]);
  let run_id = h
    .service
    .submit_script_run("hello", HashMap::new(), vec![])
    .await
    .unwrap();
  let run = wait_for_script_run(&h.store, &run_id).await;
  let log_path = run.log_path.clone().unwrap();
  assert!(std::path::Path::new(&log_path).is_file());

  h.service.delete_script_run(&run_id).await.unwrap();
  assert!(!std::path::Path::new(&log_path).exists());
  assert!(h.store.get_script_run(&run_id).await.is_err());
}

#[tokio::test]
async fn cancelling_a_finished_run_is_a_noop() {
  let workflow = WorkflowDef {
    workflow_id: "wf1".to_string(),
    name: "single".to_string(),
    nodes: vec![NodeDef {
      node_id: "only".to_string(),
      node_type: NodeType::Delay { delay_seconds: 0 },
    }],
    edges: vec![],
  };
  let h = harness(vec![], vec![workflow]);

  let run_id = h
    .service
    .submit_workflow_run("wf1", HashMap::new())
    .await
    .unwrap();
  wait_for_workflow_run(&h.store, &run_id).await;

  h.service.cancel_workflow_run(&run_id).await.unwrap();
  let run = h.store.get_workflow_run(&run_id).await.unwrap();
  assert_eq!(run.status, WorkflowRunStatus::Success);
}

#[tokio::test]
async fn cancelling_an_unknown_run_errors() {
  let h = harness(vec![], vec![]);
  assert!(h.service.cancel_workflow_run("nope").await.is_err());
}
