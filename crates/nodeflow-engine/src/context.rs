//! Per-run execution state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nodeflow_config::{Values, Workflow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::result::ExecutionSnapshot;

/// Skip reason for nodes outside the executed set.
pub const SKIP_NOT_SELECTED: &str = "not selected";
/// Skip reason for nodes fed only by inactive conditional branches.
pub const SKIP_NO_VALID_INPUT: &str = "no-valid-input";
/// Skip reason for nodes still pending when the run ends.
pub const SKIP_NOT_EXECUTED: &str = "not executed";
/// Skip reason for container nodes, which only group a loop body.
pub const SKIP_CONTAINER: &str = "container";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  Pending,
  Running,
  Paused,
  Success,
  Error,
  Aborted,
}

impl RunStatus {
  pub fn is_finished(self) -> bool {
    matches!(self, Self::Success | Self::Error | Self::Aborted)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
  Pending,
  Running,
  Success,
  Error,
  Skipped,
  Cached,
}

impl NodeStatus {
  /// Whether a node may move from `self` to `next` within one run.
  ///
  /// Loop bodies are the only place a node goes back to pending, and that
  /// goes through [`ExecutionContext::reset_nodes`] instead.
  pub fn can_transition_to(self, next: NodeStatus) -> bool {
    use NodeStatus::*;
    matches!(
      (self, next),
      (Pending, Running) | (Pending, Cached) | (Pending, Skipped) | (Pending, Error)
        | (Running, Success) | (Running, Error)
    )
  }

  pub fn is_terminal(self) -> bool {
    !matches!(self, Self::Pending | Self::Running)
  }
}

/// State of one node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionState {
  pub node_id: String,
  pub status: NodeStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inputs: Option<Values>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub outputs: Option<Values>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<String>,
}

impl NodeExecutionState {
  fn pending(node_id: &str) -> Self {
    Self {
      node_id: node_id.to_string(),
      status: NodeStatus::Pending,
      inputs: None,
      outputs: None,
      duration_ms: None,
      error: None,
      skip_reason: None,
    }
  }
}

/// Mutable state owned by a single `execute` call.
#[derive(Debug)]
pub struct ExecutionContext {
  execution_id: String,
  workflow_id: String,
  status: RunStatus,
  /// Node IDs in declaration order.
  node_order: Vec<String>,
  states: HashMap<String, NodeExecutionState>,
  /// Outputs of nodes that have produced them, read by input gathering and
  /// param resolution.
  outputs: HashMap<String, Values>,
  started_at: Option<DateTime<Utc>>,
  finished_at: Option<DateTime<Utc>>,
  planned: usize,
  completed: usize,
}

impl ExecutionContext {
  /// A fresh context with every declared node pending.
  pub fn new(execution_id: impl Into<String>, workflow: &Workflow) -> Self {
    let node_order: Vec<String> = workflow.nodes.iter().map(|n| n.id.clone()).collect();
    let states = node_order
      .iter()
      .map(|id| (id.clone(), NodeExecutionState::pending(id)))
      .collect();

    Self {
      execution_id: execution_id.into(),
      workflow_id: workflow.workflow_id.clone(),
      status: RunStatus::Pending,
      node_order,
      states,
      outputs: HashMap::new(),
      started_at: None,
      finished_at: None,
      planned: 0,
      completed: 0,
    }
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  pub fn status(&self) -> RunStatus {
    self.status
  }

  pub fn started_at(&self) -> Option<DateTime<Utc>> {
    self.started_at
  }

  pub fn finished_at(&self) -> Option<DateTime<Utc>> {
    self.finished_at
  }

  pub fn start(&mut self) {
    self.status = RunStatus::Running;
    self.started_at = Some(Utc::now());
  }

  /// Record a terminal run status and the end time.
  pub fn finish(&mut self, status: RunStatus) {
    self.status = status;
    self.finished_at = Some(Utc::now());
  }

  pub fn set_paused(&mut self, paused: bool) {
    match (self.status, paused) {
      (RunStatus::Running, true) => self.status = RunStatus::Paused,
      (RunStatus::Paused, false) => self.status = RunStatus::Running,
      _ => {}
    }
  }

  pub fn node_state(&self, node_id: &str) -> Option<&NodeExecutionState> {
    self.states.get(node_id)
  }

  pub fn node_status(&self, node_id: &str) -> Option<NodeStatus> {
    self.states.get(node_id).map(|s| s.status)
  }

  /// Node states in declaration order.
  pub fn node_states(&self) -> impl Iterator<Item = &NodeExecutionState> {
    self.node_order.iter().filter_map(|id| self.states.get(id))
  }

  pub fn outputs(&self) -> &HashMap<String, Values> {
    &self.outputs
  }

  pub fn node_outputs(&self, node_id: &str) -> Option<&Values> {
    self.outputs.get(node_id)
  }

  fn transition(&mut self, node_id: &str, next: NodeStatus) -> Option<&mut NodeExecutionState> {
    let state = self.states.get_mut(node_id)?;
    if !state.status.can_transition_to(next) {
      warn!(
        node_id = %node_id,
        from = ?state.status,
        to = ?next,
        "invalid node transition ignored"
      );
      return None;
    }
    state.status = next;
    Some(state)
  }

  pub fn mark_running(&mut self, node_id: &str, inputs: &Values) {
    if let Some(state) = self.transition(node_id, NodeStatus::Running) {
      state.inputs = Some(inputs.clone());
    }
  }

  pub fn mark_success(&mut self, node_id: &str, outputs: Values, duration_ms: u64) {
    if let Some(state) = self.transition(node_id, NodeStatus::Success) {
      state.outputs = Some(outputs.clone());
      state.duration_ms = Some(duration_ms);
      self.outputs.insert(node_id.to_string(), outputs);
    }
  }

  pub fn mark_cached(&mut self, node_id: &str, inputs: &Values, outputs: Values, duration_ms: u64) {
    if let Some(state) = self.transition(node_id, NodeStatus::Cached) {
      state.inputs = Some(inputs.clone());
      state.outputs = Some(outputs.clone());
      state.duration_ms = Some(duration_ms);
      self.outputs.insert(node_id.to_string(), outputs);
    }
  }

  pub fn mark_error(&mut self, node_id: &str, error: String, duration_ms: Option<u64>) {
    if let Some(state) = self.transition(node_id, NodeStatus::Error) {
      state.error = Some(error);
      state.duration_ms = duration_ms;
    }
  }

  pub fn mark_skipped(&mut self, node_id: &str, reason: &str) {
    if let Some(state) = self.transition(node_id, NodeStatus::Skipped) {
      state.skip_reason = Some(reason.to_string());
    }
  }

  /// Merge extra keys into a completed node's outputs.
  pub fn amend_outputs(&mut self, node_id: &str, extra: Values) {
    let Some(state) = self.states.get_mut(node_id) else {
      return;
    };
    let outputs = state.outputs.get_or_insert_with(Values::new);
    outputs.extend(extra);
    self.outputs.insert(node_id.to_string(), outputs.clone());
  }

  /// Put loop body nodes back to pending before an iteration, dropping the
  /// previous iteration's outputs.
  pub fn reset_nodes<'a>(&mut self, node_ids: impl IntoIterator<Item = &'a String>) {
    for node_id in node_ids {
      if let Some(state) = self.states.get_mut(node_id) {
        *state = NodeExecutionState::pending(node_id);
      }
      self.outputs.remove(node_id);
    }
  }

  /// Mark every pending node skipped.
  pub fn sweep_pending(&mut self) {
    for state in self.states.values_mut() {
      if state.status == NodeStatus::Pending {
        state.status = NodeStatus::Skipped;
        state.skip_reason = Some(SKIP_NOT_EXECUTED.to_string());
      }
    }
  }

  /// Set how many top-level nodes the run will step through.
  pub fn set_planned(&mut self, planned: usize) {
    self.planned = planned;
  }

  /// Count one finished top-level node and return the progress fraction.
  pub fn advance(&mut self) -> f64 {
    self.completed += 1;
    self.progress()
  }

  pub fn progress(&self) -> f64 {
    if self.planned == 0 {
      if self.status.is_finished() { 1.0 } else { 0.0 }
    } else {
      (self.completed as f64 / self.planned as f64).min(1.0)
    }
  }

  pub fn snapshot(&self) -> ExecutionSnapshot {
    ExecutionSnapshot {
      execution_id: self.execution_id.clone(),
      workflow_id: self.workflow_id.clone(),
      status: self.status,
      node_states: self.states.clone(),
      progress: self.progress(),
      started_at: self.started_at,
    }
  }
}
