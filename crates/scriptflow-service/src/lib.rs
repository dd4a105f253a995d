//! Scriptflow Service
//!
//! The submission facade over the two engines: fire-and-forget script and
//! workflow runs, cooperative workflow cancellation, log tailing, and run
//! record deletion. Callers poll the store (or tail the log) for progress;
//! nothing here blocks on a run finishing.

mod dispatch;
mod error;
mod service;

pub use dispatch::ProcessDispatcher;
pub use error::ServiceError;
pub use service::{LogTail, RunService};
