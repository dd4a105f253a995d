//! Execution events and notifiers for observability.
//!
//! Events are emitted during workflow execution to allow consumers to observe
//! progress, persist state, stream to UIs, etc.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
  /// Workflow run has started.
  WorkflowStarted { run_id: String, workflow_id: String },

  /// A node has started executing.
  NodeStarted { run_id: String, node_id: String },

  /// A node has completed successfully.
  NodeCompleted {
    run_id: String,
    node_id: String,
    output: serde_json::Value,
  },

  /// A node has failed.
  NodeFailed {
    run_id: String,
    node_id: String,
    error: String,
  },

  /// A node was skipped because an edge condition did not hold.
  NodeSkipped { run_id: String, node_id: String },

  /// Workflow run has completed successfully.
  WorkflowCompleted { run_id: String },

  /// Workflow run has failed.
  WorkflowFailed { run_id: String, error: String },

  /// Workflow run was cancelled.
  WorkflowCancelled { run_id: String },
}

/// Trait for receiving run events.
///
/// The executor calls `notify` for each event - implementations decide what
/// to do with them (persist, broadcast, log, ignore, etc.).
pub trait RunNotifier: Send + Sync {
  /// Called when a run event occurs.
  fn notify(&self, event: RunEvent);
}

/// A no-op notifier that discards all events.
///
/// Useful for tests or when event observation is not needed.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
///
/// Use this when you need to consume events asynchronously (e.g., stream log
/// tail updates to a UI).
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the run. Event volume is one
  // per node transition, so growth stays small in practice.
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  /// Create a new channel notifier.
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
