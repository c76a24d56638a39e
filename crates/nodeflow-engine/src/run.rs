//! The main loop and the single-node step.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::BoxFuture;
use nodeflow_config::{ExecutionOptions, Values, Workflow, WorkflowEdge, WorkflowNode};
use nodeflow_node::{
  CacheContext, Executable, LoopScope, NodeKind, NodeResolver, VariableResolver, VariableScope,
};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::cache::{CacheStore, CachedNodeResult};
use crate::context::{ExecutionContext, NodeStatus, SKIP_NO_VALID_INPUT};
use crate::control::RunControl;
use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::executor::lock;
use crate::plan::ExecutionPlan;

/// How a node step ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeOutcome {
  Completed(Values),
  Cached(Values),
  Skipped,
}

/// Borrowed view of everything one run needs.
pub(crate) struct WorkflowRun<'a> {
  pub(crate) resolver: &'a dyn NodeResolver,
  pub(crate) variables: &'a dyn VariableResolver,
  pub(crate) cache: &'a CacheStore,
  pub(crate) notifier: &'a dyn ExecutionNotifier,
  pub(crate) workflow: &'a Workflow,
  pub(crate) options: &'a ExecutionOptions,
  pub(crate) plan: &'a ExecutionPlan,
  pub(crate) context: &'a Mutex<ExecutionContext>,
  pub(crate) control: &'a RunControl,
}

impl WorkflowRun<'_> {
  pub(crate) async fn run(&self) -> Result<(), ExecutionError> {
    for node_id in self.plan.order() {
      self.control.checkpoint().await?;
      self.run_node(node_id, None).await?;

      let progress = lock(self.context).advance();
      self.notify(|execution_id| ExecutionEvent::Progress {
        execution_id,
        progress,
      });
    }
    Ok(())
  }

  pub(crate) fn execution_id(&self) -> String {
    lock(self.context).execution_id().to_string()
  }

  pub(crate) fn notify(&self, event: impl FnOnce(String) -> ExecutionEvent) {
    self.notifier.notify(event(self.execution_id()));
  }

  /// Run one node. Boxed so loop bodies can recurse into it.
  pub(crate) fn run_node<'s>(
    &'s self,
    node_id: &'s str,
    scope: Option<&'s LoopScope>,
  ) -> BoxFuture<'s, Result<NodeOutcome, ExecutionError>> {
    Box::pin(self.step(node_id, scope))
  }

  async fn step(&self, node_id: &str, scope: Option<&LoopScope>) -> Result<NodeOutcome, ExecutionError> {
    let node = self
      .workflow
      .get_node(node_id)
      .ok_or_else(|| ExecutionError::InvalidGraph {
        message: format!("node '{}' not found in workflow", node_id),
      })?;
    let incoming = self.plan.graph().incoming_edges(node_id);

    if self.has_no_valid_input(incoming) {
      lock(self.context).mark_skipped(node_id, SKIP_NO_VALID_INPUT);
      info!(node_id = %node_id, reason = SKIP_NO_VALID_INPUT, "node_skipped");
      self.notify(|execution_id| ExecutionEvent::NodeSkipped {
        execution_id,
        node_id: node_id.to_string(),
        reason: SKIP_NO_VALID_INPUT.to_string(),
      });
      return Ok(NodeOutcome::Skipped);
    }

    let inputs = match self.gather_inputs(node, incoming, scope) {
      Ok(inputs) => inputs,
      Err(e) => return Err(self.fail(node_id, e, None)),
    };

    let node_type = node.executable_type();
    let Some(executable) = self.resolver.resolve(node_type) else {
      let e = ExecutionError::UnknownNodeType {
        node_id: node_id.to_string(),
        node_type: node_type.to_string(),
      };
      return Err(self.fail(node_id, e, None));
    };

    let cache_ctx = CacheContext {
      node_id,
      workflow_id: &self.workflow.workflow_id,
    };
    let cacheable = self.options.use_cache && executable.should_cache(&inputs, &cache_ctx);
    let config_hash = cacheable.then(|| executable.config_hash(&inputs, &node.data));

    if let Some(hash) = &config_hash {
      if let Some(hit) = self.cache.lookup(&self.workflow.workflow_id, node_id, hash) {
        lock(self.context).mark_cached(node_id, &inputs, hit.outputs.clone(), hit.duration_ms);
        info!(node_id = %node_id, config_hash = %hash, "cache_hit");
        self.notify(|execution_id| ExecutionEvent::CacheHit {
          execution_id,
          node_id: node_id.to_string(),
          config_hash: hash.clone(),
        });
        return Ok(NodeOutcome::Cached(hit.outputs));
      }
    }

    lock(self.context).mark_running(node_id, &inputs);
    info!(node_id = %node_id, node_type = %node_type, "node_started");
    self.notify(|execution_id| ExecutionEvent::NodeStarted {
      execution_id,
      node_id: node_id.to_string(),
    });

    let started = Instant::now();
    let result = self.invoke(node, executable.as_ref(), &inputs).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let outputs = match result {
      Ok(outputs) => outputs,
      Err(e) => return Err(self.fail(node_id, e, Some(duration_ms))),
    };

    lock(self.context).mark_success(node_id, outputs.clone(), duration_ms);
    if let Some(hash) = config_hash {
      self.cache.put(
        &self.workflow.workflow_id,
        CachedNodeResult {
          node_id: node_id.to_string(),
          status: NodeStatus::Success,
          timestamp: Utc::now(),
          outputs: outputs.clone(),
          inputs: inputs.clone(),
          duration_ms,
          config_hash: hash,
        },
      );
    }
    info!(node_id = %node_id, duration_ms, "node_completed");
    self.notify(|execution_id| ExecutionEvent::NodeCompleted {
      execution_id,
      node_id: node_id.to_string(),
      outputs: outputs.clone(),
      duration_ms,
    });

    if executable.kind() == NodeKind::Loop {
      let summary = self.run_loop(node_id, &outputs, scope).await?;
      let mut ctx = lock(self.context);
      ctx.amend_outputs(node_id, summary);
      let amended = ctx.node_outputs(node_id).cloned().unwrap_or(outputs);
      return Ok(NodeOutcome::Completed(amended));
    }

    Ok(NodeOutcome::Completed(outputs))
  }

  /// Execute under the per-node timeout. A timeout of zero disables it.
  async fn invoke(
    &self,
    node: &WorkflowNode,
    executable: &dyn Executable,
    inputs: &Values,
  ) -> Result<Values, ExecutionError> {
    let timeout_ms = self.options.timeout_ms;
    let execution = executable.execute(inputs, &node.data);

    let result = if timeout_ms == 0 {
      execution.await
    } else {
      tokio::time::timeout(Duration::from_millis(timeout_ms), execution)
        .await
        .map_err(|_| ExecutionError::Timeout {
          node_id: node.id.clone(),
          timeout_ms,
        })?
    };

    result.map_err(|source| ExecutionError::NodeExecution {
      node_id: node.id.clone(),
      source,
    })
  }

  /// Record a node failure and hand the error back for propagation.
  fn fail(&self, node_id: &str, e: ExecutionError, duration_ms: Option<u64>) -> ExecutionError {
    let message = e.to_string();
    lock(self.context).mark_error(node_id, message.clone(), duration_ms);
    error!(node_id = %node_id, error = %message, "node_failed");
    self.notify(|execution_id| ExecutionEvent::NodeFailed {
      execution_id,
      node_id: node_id.to_string(),
      error: message,
    });
    e
  }

  fn is_conditional(&self, node_id: &str) -> bool {
    self
      .workflow
      .get_node(node_id)
      .and_then(|node| self.resolver.resolve(node.executable_type()))
      .is_some_and(|executable| executable.kind() == NodeKind::Conditional)
  }

  /// True when every incoming edge comes from a conditional node and none of
  /// them carries a value.
  fn has_no_valid_input(&self, incoming: &[WorkflowEdge]) -> bool {
    if incoming.is_empty() {
      return false;
    }
    if !incoming.iter().all(|edge| self.is_conditional(&edge.source)) {
      return false;
    }

    let ctx = lock(self.context);
    incoming.iter().all(|edge| {
      upstream_value(ctx.node_outputs(&edge.source), edge)
        .is_none_or(|value| value.is_null())
    })
  }

  /// Upstream values keyed by handle, overridden by the node's resolved
  /// params.
  fn gather_inputs(
    &self,
    node: &WorkflowNode,
    incoming: &[WorkflowEdge],
    scope: Option<&LoopScope>,
  ) -> Result<Values, ExecutionError> {
    let ctx = lock(self.context);
    let mut inputs = Values::new();

    for edge in incoming {
      let Some(outputs) = ctx.node_outputs(&edge.source) else {
        continue;
      };
      match edge.target_handle.as_deref().or(edge.source_handle.as_deref()) {
        Some(key) => {
          if let Some(value) = upstream_value(Some(outputs), edge) {
            inputs.insert(key.to_string(), value);
          }
        }
        None => inputs.extend(outputs.iter().map(|(k, v)| (k.clone(), v.clone()))),
      }
    }

    if !node.data.params.is_empty() {
      let variable_scope = VariableScope {
        node_outputs: ctx.outputs(),
        loop_scope: scope,
      };
      let params = self
        .variables
        .resolve_params(&node.id, &node.data.params, &variable_scope)
        .map_err(|source| ExecutionError::InputResolution {
          node_id: node.id.clone(),
          source,
        })?;
      debug!(node_id = %node.id, params = params.len(), "params_resolved");
      inputs.extend(params);
    }

    Ok(inputs)
  }
}

/// The value an edge carries: the named source output, or the whole output
/// object when the edge has no source handle.
fn upstream_value(outputs: Option<&Values>, edge: &WorkflowEdge) -> Option<Value> {
  let outputs = outputs?;
  match edge.source_handle.as_deref() {
    Some(handle) => outputs.get(handle).cloned(),
    None => Some(Value::Object(outputs.clone())),
  }
}
