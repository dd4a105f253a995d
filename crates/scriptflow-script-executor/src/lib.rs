//! Scriptflow Script Executor
//!
//! This crate runs a single script to completion as a child process:
//!
//! - The script source is written into the run's execution space and the
//!   process is spawned there with the configured interpreter
//! - Declared dependencies are installed best-effort before the run; install
//!   failures are logged but never abort the script
//! - Combined stdout and stderr stream to a per-run log file on disk
//! - A deadline bounds the run; an overdue process is killed
//!
//! The executor distinguishes setup failures (returned as [`ScriptError`])
//! from script failures (returned as a failed [`RunOutcome`]). A script that
//! exits non-zero, fails to spawn, or hits its deadline is a business
//! outcome, not an executor error.

mod error;
mod executor;
mod request;

pub use error::ScriptError;
pub use executor::{ExecutorConfig, ScriptExecutor};
pub use request::{RunOutcome, RunRequest, ScriptStatus, UploadedFile};
