//! Scriptflow Registry
//!
//! Lookup seams the execution engines depend on: scripts by id, workflow
//! definitions by id, and interpreter binaries by language and optional
//! environment. The in-memory implementations back the CLI and tests;
//! a management service would supply database-backed ones.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use scriptflow_config::{Language, ScriptDef, WorkflowDef};

/// Looks up script definitions by id.
#[async_trait]
pub trait ScriptRepository: Send + Sync {
  async fn get_script(&self, script_id: &str) -> Option<ScriptDef>;
}

/// Looks up workflow definitions by id.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
  async fn get_workflow(&self, workflow_id: &str) -> Option<WorkflowDef>;
}

/// Resolves the interpreter binary for a run.
pub trait InterpreterRegistry: Send + Sync {
  /// Resolve the interpreter for a language, honoring a named environment
  /// when one is registered for that language. An unknown environment id
  /// falls back to the language default.
  fn resolve_interpreter(&self, language: Language, environment_id: Option<&str>) -> PathBuf;
}

/// In-memory script repository.
#[derive(Default)]
pub struct InMemoryScripts {
  scripts: HashMap<String, ScriptDef>,
}

impl InMemoryScripts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, script: ScriptDef) {
    self.scripts.insert(script.script_id.clone(), script);
  }
}

#[async_trait]
impl ScriptRepository for InMemoryScripts {
  async fn get_script(&self, script_id: &str) -> Option<ScriptDef> {
    self.scripts.get(script_id).cloned()
  }
}

/// In-memory workflow repository.
#[derive(Default)]
pub struct InMemoryWorkflows {
  workflows: HashMap<String, WorkflowDef>,
}

impl InMemoryWorkflows {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, workflow: WorkflowDef) {
    self.workflows.insert(workflow.workflow_id.clone(), workflow);
  }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflows {
  async fn get_workflow(&self, workflow_id: &str) -> Option<WorkflowDef> {
    self.workflows.get(workflow_id).cloned()
  }
}

/// A named interpreter environment: a specific binary for one language.
#[derive(Debug, Clone)]
pub struct Environment {
  pub language: Language,
  pub interpreter: PathBuf,
}

/// Table-driven interpreter registry with per-language defaults and
/// optional named environments.
pub struct InterpreterTable {
  defaults: HashMap<Language, PathBuf>,
  environments: HashMap<String, Environment>,
}

impl InterpreterTable {
  /// Registry with the stock `python3` and `node` defaults.
  pub fn new() -> Self {
    let mut defaults = HashMap::new();
    defaults.insert(Language::Python, PathBuf::from("python3"));
    defaults.insert(Language::Javascript, PathBuf::from("node"));
    Self {
      defaults,
      environments: HashMap::new(),
    }
  }

  pub fn set_default(&mut self, language: Language, interpreter: impl Into<PathBuf>) {
    self.defaults.insert(language, interpreter.into());
  }

  pub fn register_environment(&mut self, environment_id: impl Into<String>, env: Environment) {
    self.environments.insert(environment_id.into(), env);
  }
}

impl Default for InterpreterTable {
  fn default() -> Self {
    Self::new()
  }
}

impl InterpreterRegistry for InterpreterTable {
  fn resolve_interpreter(&self, language: Language, environment_id: Option<&str>) -> PathBuf {
    if let Some(env) = environment_id.and_then(|id| self.environments.get(id)) {
      // An environment registered for a different language does not apply.
      if env.language == language {
        return env.interpreter.clone();
      }
    }
    self
      .defaults
      .get(&language)
      .cloned()
      .unwrap_or_else(|| PathBuf::from(language.to_string()))
  }
}
