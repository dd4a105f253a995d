use serde::{Deserialize, Serialize};

/// Script language tag. Determines the file extension of the materialized
/// script and which package manager installs declared dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
  Python,
  Javascript,
}

impl Language {
  /// File extension for a materialized script of this language.
  pub fn extension(&self) -> &'static str {
    match self {
      Language::Python => "py",
      Language::Javascript => "js",
    }
  }
}

impl std::fmt::Display for Language {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Language::Python => write!(f, "python"),
      Language::Javascript => write!(f, "javascript"),
    }
  }
}

/// A declared script parameter. Parameters are resolved to a flat
/// string-to-string map before execution and injected as environment
/// variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
  pub name: String,
  #[serde(default)]
  pub required: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<String>,
}

/// A reusable unit of code.
///
/// Immutable once referenced by a run - edits produce a new version through
/// the external CRUD layer, which is out of scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDef {
  pub script_id: String,
  pub name: String,
  pub language: Language,
  pub source: String,
  /// Package names installed (best-effort) before the script runs.
  #[serde(default)]
  pub dependencies: Vec<String>,
  #[serde(default)]
  pub parameters: Vec<ParameterDef>,
  /// Optional execution environment providing an interpreter override.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub environment_id: Option<String>,
}
