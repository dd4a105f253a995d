use std::path::PathBuf;

use thiserror::Error;

/// Setup errors raised before the script process is spawned.
#[derive(Debug, Error)]
pub enum ScriptError {
  #[error("execution space error: {0}")]
  Space(#[from] scriptflow_space::SpaceError),

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
