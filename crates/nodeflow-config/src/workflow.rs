use serde::{Deserialize, Serialize};

use crate::edge::WorkflowEdge;
use crate::node::WorkflowNode;

/// A workflow as authored in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
  pub workflow_id: String,
  #[serde(default)]
  pub nodes: Vec<WorkflowNode>,
  #[serde(default)]
  pub edges: Vec<WorkflowEdge>,
  /// Explicit node selection. `None` or empty runs the whole workflow.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selected_node_ids: Option<Vec<String>>,
}

impl Workflow {
  pub fn new(workflow_id: impl Into<String>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      nodes: Vec::new(),
      edges: Vec::new(),
      selected_node_ids: None,
    }
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&WorkflowNode> {
    self.nodes.iter().find(|node| node.id == node_id)
  }

  /// The explicit node selection, if any non-empty selection was made.
  pub fn selection(&self) -> Option<&[String]> {
    self
      .selected_node_ids
      .as_deref()
      .filter(|selected| !selected.is_empty())
  }
}
