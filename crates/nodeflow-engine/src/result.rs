//! Run results and snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{ExecutionContext, NodeExecutionState, NodeStatus, RunStatus};
use crate::plan::ExecutionStrategy;

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
  pub execution_id: String,
  pub workflow_id: String,
  pub success: bool,
  pub status: RunStatus,
  pub strategy: ExecutionStrategy,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub finished_at: Option<DateTime<Utc>>,
  pub duration_ms: u64,
  /// Final state of every declared node, keyed by node ID.
  pub node_results: HashMap<String, NodeExecutionState>,
  /// Nodes that ran (success, error, or still running), in declaration order.
  pub executed_node_ids: Vec<String>,
  pub skipped_node_ids: Vec<String>,
  pub cached_node_ids: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ExecutionResult {
  pub(crate) fn from_context(
    context: &ExecutionContext,
    strategy: ExecutionStrategy,
    error: Option<String>,
  ) -> Self {
    let mut executed_node_ids = Vec::new();
    let mut skipped_node_ids = Vec::new();
    let mut cached_node_ids = Vec::new();
    let mut node_results = HashMap::new();

    for state in context.node_states() {
      match state.status {
        NodeStatus::Success | NodeStatus::Running | NodeStatus::Error => {
          executed_node_ids.push(state.node_id.clone())
        }
        NodeStatus::Skipped => skipped_node_ids.push(state.node_id.clone()),
        NodeStatus::Cached => cached_node_ids.push(state.node_id.clone()),
        NodeStatus::Pending => {}
      }
      node_results.insert(state.node_id.clone(), state.clone());
    }

    let duration_ms = match (context.started_at(), context.finished_at()) {
      (Some(start), Some(end)) => u64::try_from((end - start).num_milliseconds()).unwrap_or(0),
      _ => 0,
    };

    Self {
      execution_id: context.execution_id().to_string(),
      workflow_id: context.workflow_id().to_string(),
      success: context.status() == RunStatus::Success,
      status: context.status(),
      strategy,
      started_at: context.started_at(),
      finished_at: context.finished_at(),
      duration_ms,
      node_results,
      executed_node_ids,
      skipped_node_ids,
      cached_node_ids,
      error,
    }
  }

  pub fn node(&self, node_id: &str) -> Option<&NodeExecutionState> {
    self.node_results.get(node_id)
  }

  pub fn status_of(&self, node_id: &str) -> Option<NodeStatus> {
    self.node(node_id).map(|state| state.status)
  }
}

/// Point-in-time view of an active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshot {
  pub execution_id: String,
  pub workflow_id: String,
  pub status: RunStatus,
  pub node_states: HashMap<String, NodeExecutionState>,
  /// Fraction of planned top-level nodes finished, from 0 to 1.
  pub progress: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use nodeflow_config::{Values, Workflow, WorkflowNode};

  #[test]
  fn test_result_partitions_nodes_by_status() {
    let mut workflow = Workflow::new("wf");
    workflow.nodes = vec![
      WorkflowNode::new("ran", "set"),
      WorkflowNode::new("failed", "set"),
      WorkflowNode::new("hit", "set"),
      WorkflowNode::new("never", "set"),
    ];
    let mut ctx = ExecutionContext::new("exec", &workflow);
    ctx.start();
    ctx.mark_running("ran", &Values::new());
    ctx.mark_success("ran", Values::new(), 1);
    ctx.mark_running("failed", &Values::new());
    ctx.mark_error("failed", "boom".to_string(), Some(2));
    ctx.mark_cached("hit", &Values::new(), Values::new(), 3);
    ctx.sweep_pending();
    ctx.finish(RunStatus::Error);

    let result = ExecutionResult::from_context(&ctx, ExecutionStrategy::Full, Some("boom".to_string()));

    assert!(!result.success);
    assert_eq!(result.executed_node_ids, vec!["ran", "failed"]);
    assert_eq!(result.cached_node_ids, vec!["hit"]);
    assert_eq!(result.skipped_node_ids, vec!["never"]);
    assert_eq!(result.node_results.len(), 4);
  }

  #[test]
  fn test_result_serializes_camel_case() {
    let workflow = Workflow::new("wf");
    let mut ctx = ExecutionContext::new("exec", &workflow);
    ctx.start();
    ctx.finish(RunStatus::Success);

    let json = serde_json::to_value(ExecutionResult::from_context(&ctx, ExecutionStrategy::Full, None))
      .unwrap();
    assert_eq!(json["executionId"], "exec");
    assert_eq!(json["status"], "success");
    assert!(json.get("error").is_none());
  }
}
