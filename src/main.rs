use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scriptflow_config::{ScriptDef, WorkflowDef};
use scriptflow_registry::{InMemoryScripts, InMemoryWorkflows, InterpreterTable};
use scriptflow_script_executor::{ExecutorConfig, ScriptExecutor, UploadedFile};
use scriptflow_service::{ProcessDispatcher, RunService};
use scriptflow_space::SpaceManager;
use scriptflow_store::{SqliteStore, Store};
use scriptflow_workflow_executor::WorkflowExecutor;

/// Scriptflow - run scripts and script workflows
#[derive(Parser)]
#[command(name = "scriptflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.scriptflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a script or a workflow
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run a single script definition
  Script {
    /// Path to the script definition file (JSON)
    script_file: PathBuf,

    /// Runtime parameter, key=value; repeatable
    #[arg(long = "param")]
    params: Vec<String>,

    /// File to place in the execution space; repeatable
    #[arg(long = "file")]
    files: Vec<PathBuf>,
  },

  /// Run a workflow definition
  Workflow {
    /// Path to the workflow file (JSON, optionally with a "scripts" list)
    workflow_file: PathBuf,

    /// Runtime parameter, key=value; repeatable
    #[arg(long = "param")]
    params: Vec<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".scriptflow")
  });

  match cli.command {
    Some(Commands::Run { target }) => match target {
      RunTarget::Script {
        script_file,
        params,
        files,
      } => {
        run_script(script_file, params, files, data_dir).await?;
      }
      RunTarget::Workflow {
        workflow_file,
        params,
      } => {
        run_workflow(workflow_file, params, data_dir).await?;
      }
    },
    None => {
      println!("scriptflow - use --help to see available commands");
    }
  }

  Ok(())
}

struct App {
  service: RunService,
  store: Arc<dyn Store>,
}

async fn build_app(
  data_dir: &PathBuf,
  scripts: Vec<ScriptDef>,
  workflows: Vec<WorkflowDef>,
) -> Result<App> {
  std::fs::create_dir_all(data_dir)
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let options = SqliteConnectOptions::new()
    .filename(data_dir.join("scriptflow.db"))
    .create_if_missing(true);
  let pool = SqlitePool::connect_with(options)
    .await
    .context("failed to open database")?;
  let sqlite = SqliteStore::new(pool);
  sqlite.migrate().await.context("failed to run migrations")?;
  let store: Arc<dyn Store> = Arc::new(sqlite);

  let mut script_repo = InMemoryScripts::new();
  for script in scripts {
    script_repo.insert(script);
  }
  let script_repo = Arc::new(script_repo);

  let mut workflow_repo = InMemoryWorkflows::new();
  for workflow in workflows {
    workflow_repo.insert(workflow);
  }

  let spaces = Arc::new(SpaceManager::new(data_dir.join("spaces")));
  let executor = Arc::new(ScriptExecutor::new(
    ExecutorConfig::new(data_dir.join("logs")),
    spaces.clone(),
  ));
  let dispatcher = Arc::new(ProcessDispatcher::new(
    store.clone(),
    script_repo.clone(),
    Arc::new(InterpreterTable::new()),
    executor,
  ));
  let workflow_executor = Arc::new(WorkflowExecutor::new(store.clone(), dispatcher.clone()));

  Ok(App {
    service: RunService::new(
      store.clone(),
      script_repo,
      Arc::new(workflow_repo),
      spaces,
      dispatcher,
      workflow_executor,
    ),
    store,
  })
}

async fn run_script(
  script_file: PathBuf,
  params: Vec<String>,
  files: Vec<PathBuf>,
  data_dir: PathBuf,
) -> Result<()> {
  let content = tokio::fs::read_to_string(&script_file)
    .await
    .with_context(|| format!("failed to read script file: {}", script_file.display()))?;
  let script: ScriptDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse script file: {}", script_file.display()))?;
  let script_id = script.script_id.clone();

  eprintln!("Loaded script: {}", script.name);

  let mut uploaded_files = Vec::with_capacity(files.len());
  for path in files {
    let name = path
      .file_name()
      .with_context(|| format!("invalid file path: {}", path.display()))?
      .to_string_lossy()
      .into_owned();
    let contents = tokio::fs::read(&path)
      .await
      .with_context(|| format!("failed to read file: {}", path.display()))?;
    uploaded_files.push(UploadedFile { name, contents });
  }

  let app = build_app(&data_dir, vec![script], vec![]).await?;
  let run_id = app
    .service
    .submit_script_run(&script_id, parse_params(&params)?, uploaded_files)
    .await?;
  eprintln!("Run submitted: {run_id}");

  let run = loop {
    let run = app.store.get_script_run(&run_id).await?;
    if run.status.is_terminal() {
      break run;
    }
    tokio::time::sleep(Duration::from_millis(250)).await;
  };

  let tail = app.service.tail_log(&run_id).await?;
  if !tail.content.is_empty() {
    print!("{}", tail.content);
  }
  match run.error {
    None => Ok(()),
    Some(error) => {
      eprintln!("Run failed: {error}");
      std::process::exit(1);
    }
  }
}

async fn run_workflow(workflow_file: PathBuf, params: Vec<String>, data_dir: PathBuf) -> Result<()> {
  let content = tokio::fs::read_to_string(&workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;
  let document: serde_json::Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))?;

  // The file is either a bare workflow definition or a bundle with an
  // embedded "scripts" list.
  let (workflow, scripts): (WorkflowDef, Vec<ScriptDef>) = match document.get("workflow") {
    Some(inner) => (
      serde_json::from_value(inner.clone()).context("failed to parse workflow definition")?,
      match document.get("scripts") {
        Some(scripts) => {
          serde_json::from_value(scripts.clone()).context("failed to parse scripts list")?
        }
        None => vec![],
      },
    ),
    None => (
      serde_json::from_value(document).context("failed to parse workflow definition")?,
      vec![],
    ),
  };
  let workflow_id = workflow.workflow_id.clone();

  eprintln!("Loaded workflow: {}", workflow.name);

  let app = build_app(&data_dir, scripts, vec![workflow]).await?;
  let run_id = app
    .service
    .submit_workflow_run(&workflow_id, parse_params(&params)?)
    .await?;
  eprintln!("Run submitted: {run_id}");

  let run = loop {
    let run = app.store.get_workflow_run(&run_id).await?;
    if run.status.is_terminal() {
      break run;
    }
    tokio::time::sleep(Duration::from_millis(250)).await;
  };

  let node_runs = app.store.list_node_runs(&run_id).await?;
  let output: serde_json::Map<String, serde_json::Value> = node_runs
    .into_iter()
    .map(|node_run| {
      (
        node_run.node_id,
        serde_json::json!({
          "status": node_run.status,
          "output": node_run.output.map(|o| o.0),
          "error": node_run.error,
        }),
      )
    })
    .collect();
  println!("{}", serde_json::to_string_pretty(&output)?);

  match run.error {
    None => Ok(()),
    Some(error) => {
      eprintln!("Run failed: {error}");
      std::process::exit(1);
    }
  }
}

fn parse_params(params: &[String]) -> Result<HashMap<String, String>> {
  params
    .iter()
    .map(|raw| {
      raw
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .with_context(|| format!("invalid parameter (expected key=value): {raw}"))
    })
    .collect()
}
