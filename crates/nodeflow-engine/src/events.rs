//! Execution events and notifiers for observability.
//!
//! Events are emitted synchronously at fixed points of a run. Notifiers must
//! return quickly; anything slow belongs behind a [`ChannelNotifier`].

use nodeflow_config::Values;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  WorkflowStarted {
    execution_id: String,
    workflow_id: String,
  },

  NodeStarted {
    execution_id: String,
    node_id: String,
  },

  NodeCompleted {
    execution_id: String,
    node_id: String,
    outputs: Values,
    duration_ms: u64,
  },

  NodeFailed {
    execution_id: String,
    node_id: String,
    error: String,
  },

  NodeSkipped {
    execution_id: String,
    node_id: String,
    reason: String,
  },

  /// A node was served from the cache without running.
  CacheHit {
    execution_id: String,
    node_id: String,
    config_hash: String,
  },

  /// Fraction of the planned top-level nodes that have finished.
  Progress { execution_id: String, progress: f64 },

  WorkflowCompleted {
    execution_id: String,
    duration_ms: u64,
  },

  WorkflowFailed { execution_id: String, error: String },

  /// The run was stopped by the caller.
  WorkflowAborted { execution_id: String },
}

/// Receives execution events.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

type Hook<A> = Box<dyn Fn(A) + Send + Sync>;

/// Optional callbacks for the common notification points.
///
/// ```ignore
/// let hooks = ExecutionHooks::new()
///   .on_node_complete(|(node_id, _outputs)| println!("{} done", node_id))
///   .on_progress(|p| println!("{:.0}%", p * 100.0));
/// let executor = WorkflowExecutor::new(registry).with_notifier(hooks);
/// ```
#[derive(Default)]
pub struct ExecutionHooks {
  run_started: Option<Hook<String>>,
  run_complete: Option<Hook<u64>>,
  run_error: Option<Hook<String>>,
  node_start: Option<Hook<String>>,
  node_complete: Option<Hook<(String, Values)>>,
  node_error: Option<Hook<(String, String)>>,
  progress: Option<Hook<f64>>,
  cache_hit: Option<Hook<String>>,
}

impl ExecutionHooks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Called with the workflow ID when a run starts.
  pub fn on_run_start(mut self, hook: impl Fn(String) + Send + Sync + 'static) -> Self {
    self.run_started = Some(Box::new(hook));
    self
  }

  /// Called with the run duration in milliseconds.
  pub fn on_run_complete(mut self, hook: impl Fn(u64) + Send + Sync + 'static) -> Self {
    self.run_complete = Some(Box::new(hook));
    self
  }

  /// Called with the error message when a run fails or is stopped.
  pub fn on_run_error(mut self, hook: impl Fn(String) + Send + Sync + 'static) -> Self {
    self.run_error = Some(Box::new(hook));
    self
  }

  pub fn on_node_start(mut self, hook: impl Fn(String) + Send + Sync + 'static) -> Self {
    self.node_start = Some(Box::new(hook));
    self
  }

  pub fn on_node_complete(mut self, hook: impl Fn((String, Values)) + Send + Sync + 'static) -> Self {
    self.node_complete = Some(Box::new(hook));
    self
  }

  pub fn on_node_error(mut self, hook: impl Fn((String, String)) + Send + Sync + 'static) -> Self {
    self.node_error = Some(Box::new(hook));
    self
  }

  pub fn on_progress(mut self, hook: impl Fn(f64) + Send + Sync + 'static) -> Self {
    self.progress = Some(Box::new(hook));
    self
  }

  pub fn on_cache_hit(mut self, hook: impl Fn(String) + Send + Sync + 'static) -> Self {
    self.cache_hit = Some(Box::new(hook));
    self
  }
}

impl ExecutionNotifier for ExecutionHooks {
  fn notify(&self, event: ExecutionEvent) {
    match event {
      ExecutionEvent::WorkflowStarted { workflow_id, .. } => {
        if let Some(hook) = &self.run_started {
          hook(workflow_id);
        }
      }
      ExecutionEvent::NodeStarted { node_id, .. } => {
        if let Some(hook) = &self.node_start {
          hook(node_id);
        }
      }
      ExecutionEvent::NodeCompleted { node_id, outputs, .. } => {
        if let Some(hook) = &self.node_complete {
          hook((node_id, outputs));
        }
      }
      ExecutionEvent::NodeFailed { node_id, error, .. } => {
        if let Some(hook) = &self.node_error {
          hook((node_id, error));
        }
      }
      ExecutionEvent::CacheHit { node_id, .. } => {
        if let Some(hook) = &self.cache_hit {
          hook(node_id);
        }
      }
      ExecutionEvent::Progress { progress, .. } => {
        if let Some(hook) = &self.progress {
          hook(progress);
        }
      }
      ExecutionEvent::WorkflowCompleted { duration_ms, .. } => {
        if let Some(hook) = &self.run_complete {
          hook(duration_ms);
        }
      }
      ExecutionEvent::WorkflowFailed { error, .. } => {
        if let Some(hook) = &self.run_error {
          hook(error);
        }
      }
      ExecutionEvent::WorkflowAborted { .. } => {
        if let Some(hook) = &self.run_error {
          hook("execution cancelled".to_string());
        }
      }
      ExecutionEvent::NodeSkipped { .. } => {}
    }
  }
}
