use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
///
/// `source_handle` names the output of `source` that feeds the
/// `target_handle` input of `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_handle: Option<String>,
}

impl WorkflowEdge {
  pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
    }
  }

  /// Set the source and target handles.
  pub fn with_handles(
    mut self,
    source_handle: impl Into<String>,
    target_handle: impl Into<String>,
  ) -> Self {
    self.source_handle = Some(source_handle.into());
    self.target_handle = Some(target_handle.into());
    self
  }

  /// Set only the source handle; the target receives it under the same name.
  pub fn with_source_handle(mut self, source_handle: impl Into<String>) -> Self {
    self.source_handle = Some(source_handle.into());
    self
  }
}
