//! Scriptflow Workflow Executor
//!
//! This crate drives one workflow run to completion: it traverses the
//! dependency graph in queue order, evaluates edge conditions to decide
//! whether each node runs or is skipped, dispatches script nodes through a
//! [`ScriptDispatcher`], and records every node's outcome through the store.
//!
//! Traversal discipline:
//! - A FIFO queue is seeded with the graph's entry nodes
//! - Successors are enqueued only when a predecessor completes and all of
//!   the successor's dependencies are in the executed set; a popped node
//!   with unready dependencies is dropped, never requeued
//! - A failed edge condition marks the node skipped, and skipped nodes
//!   still enqueue their successors so the skip can cascade
//!
//! A failed script node decides the run's terminal status (`failed`) but
//! does not halt traversal: downstream edges conditioned on the failure
//! still fire, while unconditional edges require predecessor success and so
//! skip everything downstream of the failure in a plain chain.

mod dispatch;
mod error;
mod events;
mod executor;
mod expr;
mod result;

pub use dispatch::{DispatchContext, DispatchError, ScriptDispatcher, ScriptNodeOutcome};
pub use error::ExecutionError;
pub use events::{ChannelNotifier, NoopNotifier, RunEvent, RunNotifier};
pub use executor::WorkflowExecutor;
pub use expr::{ExprError, evaluate};
pub use result::{NodeOutcome, WorkflowOutcome};
