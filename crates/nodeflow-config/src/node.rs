use serde::{Deserialize, Serialize};

use crate::Values;

/// Node type that marks the entry point of a full run.
pub const START_NODE_TYPE: &str = "start";

/// A node on the workflow canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
  pub id: String,
  /// Structural type assigned by the editor.
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub data: NodeData,
  /// Container this node belongs to. The only signal of loop-body membership.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_node: Option<String>,
}

/// Editor-owned payload of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
  #[serde(default)]
  pub config: serde_json::Value,
  /// Declared parameters. String values may embed `{{ ... }}` references.
  #[serde(default, skip_serializing_if = "Values::is_empty")]
  pub params: Values,
  /// Last result shown in the editor. Not read by the engine.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<serde_json::Value>,
  /// Executable type, when it differs from the structural type.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_type: Option<String>,
  /// Explicit start marker for nodes whose type is not `start`.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub is_start: bool,
}

impl WorkflowNode {
  pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type: node_type.into(),
      data: NodeData::default(),
      parent_node: None,
    }
  }

  /// Set a declared parameter.
  pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.data.params.insert(key.into(), value);
    self
  }

  /// Place the node inside a container.
  pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
    self.parent_node = Some(parent.into());
    self
  }

  /// The type used to resolve an executor: `data.nodeType`, falling back to
  /// the structural type.
  pub fn executable_type(&self) -> &str {
    self.data.node_type.as_deref().unwrap_or(&self.node_type)
  }

  /// Whether this node seeds reachability in a full run.
  pub fn is_start(&self) -> bool {
    self.data.is_start || self.executable_type() == START_NODE_TYPE
  }
}
