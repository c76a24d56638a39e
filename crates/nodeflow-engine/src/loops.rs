//! Loop nodes: running a container body once per iteration.

use nodeflow_config::Values;
use nodeflow_graph::ContainerBody;
use nodeflow_node::{LoopDirective, LoopScope, PageWindow};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::ExecutionError;
use crate::executor::lock;
use crate::run::{NodeOutcome, WorkflowRun};

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
  /// Position in the full iteration list.
  pub index: usize,
  pub item: Value,
  pub success: bool,
  /// Outputs of the last body node that ran.
  pub output: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Aggregate written back onto the loop node's outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopSummary {
  pub total_count: usize,
  pub executed_count: usize,
  pub success_count: usize,
  pub error_count: usize,
  pub results: Vec<IterationRecord>,
  pub pagination: Value,
  pub summary: String,
}

impl LoopSummary {
  fn new(total: usize, window: &PageWindow, results: Vec<IterationRecord>) -> Self {
    let success_count = results.iter().filter(|r| r.success).count();
    let error_count = results.len() - success_count;
    let summary = format!(
      "executed {} of {} iterations ({} succeeded, {} failed)",
      results.len(),
      total,
      success_count,
      error_count
    );

    Self {
      total_count: total,
      executed_count: results.len(),
      success_count,
      error_count,
      results,
      pagination: json!({
        "page": window.page,
        "pageSize": window.page_size,
        "totalPages": window.total_pages,
      }),
      summary,
    }
  }

  fn into_values(self) -> Values {
    match serde_json::to_value(self) {
      Ok(Value::Object(map)) => map,
      _ => Values::new(),
    }
  }
}

impl WorkflowRun<'_> {
  /// Run the container a loop node points at, once per iteration in the
  /// current page, and return the summary to merge into the loop node's
  /// outputs.
  pub(crate) async fn run_loop(
    &self,
    node_id: &str,
    outputs: &Values,
    scope: Option<&LoopScope>,
  ) -> Result<Values, ExecutionError> {
    let directive = LoopDirective::from_outputs(outputs).map_err(|e| ExecutionError::LoopContainer {
      node_id: node_id.to_string(),
      message: format!("invalid loop output: {}", e),
    })?;
    let window = directive.window();
    let total = directive.iterations.len();

    let Some(container_id) = directive.container_id.as_deref() else {
      debug!(node_id = %node_id, "loop has no container");
      return Ok(LoopSummary::new(total, &window, Vec::new()).into_values());
    };
    if directive.iterations.is_empty() {
      debug!(node_id = %node_id, "loop has no iterations");
      return Ok(LoopSummary::new(total, &window, Vec::new()).into_values());
    }
    if !self.plan.graph().contains(container_id) {
      return Err(ExecutionError::LoopContainer {
        node_id: node_id.to_string(),
        message: format!("container '{}' not found in workflow", container_id),
      });
    }

    let body = self.plan.containers().get(container_id);
    let parent_scope = scope.cloned().unwrap_or_default();

    info!(
      node_id = %node_id,
      container_id = %container_id,
      total,
      start = window.start,
      end = window.end,
      "loop_started"
    );

    let mut results = Vec::with_capacity(window.len());
    for index in window.start..window.end {
      self.control.checkpoint().await?;

      let item = LoopDirective::item_of(&directive.iterations[index]);
      let iteration_scope = parent_scope.child(
        &directive.item_variable,
        item.clone(),
        &directive.index_variable,
        index,
      );

      match self.run_iteration(body, &iteration_scope).await {
        Ok(output) => results.push(IterationRecord {
          index,
          item,
          success: true,
          output,
          error: None,
        }),
        Err(e) if directive.continue_on_error && e.is_node_failure() => {
          warn!(node_id = %node_id, index, error = %e, "loop_iteration_failed");
          results.push(IterationRecord {
            index,
            item,
            success: false,
            output: Value::Null,
            error: Some(e.to_string()),
          });
        }
        Err(e) => return Err(e),
      }
    }

    let summary = LoopSummary::new(total, &window, results);
    info!(
      node_id = %node_id,
      executed = summary.executed_count,
      succeeded = summary.success_count,
      failed = summary.error_count,
      "loop_completed"
    );
    Ok(summary.into_values())
  }

  /// Run the body once. The result is the output of the last node that ran
  /// or came from cache.
  async fn run_iteration(
    &self,
    body: Option<&ContainerBody>,
    scope: &LoopScope,
  ) -> Result<Value, ExecutionError> {
    let Some(body) = body else {
      return Ok(Value::Null);
    };

    lock(self.context).reset_nodes(&body.children);

    let mut last = Value::Null;
    for child in &body.order {
      self.control.checkpoint().await?;
      match self.run_node(child, Some(scope)).await? {
        NodeOutcome::Completed(outputs) | NodeOutcome::Cached(outputs) => {
          last = Value::Object(outputs);
        }
        NodeOutcome::Skipped => {}
      }
    }
    Ok(last)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(index: usize, success: bool) -> IterationRecord {
    IterationRecord {
      index,
      item: json!(index),
      success,
      output: Value::Null,
      error: (!success).then(|| "boom".to_string()),
    }
  }

  #[test]
  fn test_summary_counts_and_pagination() {
    let window = PageWindow {
      start: 0,
      end: 3,
      page: 1,
      page_size: 3,
      total_pages: 1,
    };
    let summary = LoopSummary::new(3, &window, vec![record(0, true), record(1, false), record(2, true)]);

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.error_count, 1);

    let values = summary.into_values();
    assert_eq!(values["totalCount"], json!(3));
    assert_eq!(values["executedCount"], json!(3));
    assert_eq!(values["pagination"]["pageSize"], json!(3));
    assert_eq!(values["results"][1]["error"], json!("boom"));
    assert!(values["summary"].as_str().unwrap().contains("2 succeeded"));
  }
}
