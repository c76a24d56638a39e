//! Execution errors.

use nodeflow_graph::GraphError;
use nodeflow_node::NodeError;

/// Errors that can end a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
  /// The workflow failed structural validation or contains a cycle.
  #[error("invalid workflow graph: {0}")]
  Graph(#[from] GraphError),

  /// Invalid workflow graph outside what the graph analyzer checks.
  #[error("invalid workflow graph: {message}")]
  InvalidGraph { message: String },

  /// No executor is registered for the node's type.
  #[error("no executor found for type '{node_type}' (node '{node_id}')")]
  UnknownNodeType { node_id: String, node_type: String },

  /// Param resolution failed.
  #[error("failed to resolve inputs for node '{node_id}': {source}")]
  InputResolution {
    node_id: String,
    #[source]
    source: NodeError,
  },

  /// The node's own execute returned an error.
  #[error("node '{node_id}' failed: {source}")]
  NodeExecution {
    node_id: String,
    #[source]
    source: NodeError,
  },

  /// The node did not finish within the per-node timeout.
  #[error("node '{node_id}' timed out after {timeout_ms}ms")]
  Timeout { node_id: String, timeout_ms: u64 },

  /// A loop node referenced a container that cannot be run.
  #[error("loop node '{node_id}': {message}")]
  LoopContainer { node_id: String, message: String },

  /// The executor is already bound to a run.
  #[error("a workflow is already running on this executor")]
  AlreadyRunning,

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}

impl ExecutionError {
  /// Errors in the workflow's shape. Always fatal and never retried.
  pub fn is_structural(&self) -> bool {
    matches!(
      self,
      Self::Graph(_) | Self::InvalidGraph { .. } | Self::UnknownNodeType { .. } | Self::LoopContainer { .. }
    )
  }

  /// Failures attributable to a single node. These are the only errors a
  /// loop configured to continue on error absorbs.
  pub fn is_node_failure(&self) -> bool {
    matches!(
      self,
      Self::NodeExecution { .. } | Self::Timeout { .. } | Self::InputResolution { .. }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classification() {
    let cycle = ExecutionError::from(GraphError::CyclicDependency {
      nodes: vec!["a".to_string(), "b".to_string()],
    });
    assert!(cycle.is_structural());
    assert!(!cycle.is_node_failure());

    let timeout = ExecutionError::Timeout {
      node_id: "slow".to_string(),
      timeout_ms: 10,
    };
    assert!(timeout.is_node_failure());
    assert!(!timeout.is_structural());

    assert!(!ExecutionError::Cancelled.is_node_failure());
    assert!(!ExecutionError::Cancelled.is_structural());
  }

  #[test]
  fn test_node_failure_message_includes_cause() {
    let err = ExecutionError::NodeExecution {
      node_id: "click".to_string(),
      source: NodeError::failed("element not found"),
    };
    assert_eq!(err.to_string(), "node 'click' failed: element not found");
  }
}
