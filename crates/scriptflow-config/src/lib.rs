//! Scriptflow Config
//!
//! This crate provides the serializable definition types for scriptflow:
//! scripts (reusable units of code) and workflows (directed graphs of nodes
//! connected by optionally-conditioned edges).
//!
//! Definitions are created and edited by external tooling and are read-only
//! to the execution core. The locked, validated form lives in
//! `scriptflow-workflow`.

mod condition;
mod script;
mod workflow;

pub use condition::ConditionDef;
pub use script::{Language, ParameterDef, ScriptDef};
pub use workflow::{EdgeDef, NodeDef, NodeType, WorkflowDef};
