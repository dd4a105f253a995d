//! Scriptflow Workflow
//!
//! This crate provides the locked workflow representation: a validated form
//! of a `scriptflow_config::WorkflowDef` that is ready for execution.
//!
//! Locking enforces what the definition layer does not:
//! - Node ids are unique within the workflow
//! - Every edge references known node ids
//!
//! Cycle detection is deliberately NOT done here - the scheduler defends
//! against cycles at execution time by only enqueuing nodes whose
//! dependencies have all completed.

mod error;
mod graph;
mod workflow;

pub use error::WorkflowError;
pub use graph::{EdgeRef, Graph};
pub use workflow::Workflow;
