use thiserror::Error;

/// Errors a node reports from its own execution.
#[derive(Debug, Error)]
pub enum NodeError {
  /// Invalid input value.
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// A `{{ ... }}` reference in a param could not be resolved.
  #[error("failed to resolve param '{key}': {message}")]
  Template { key: String, message: String },

  /// The node ran and failed.
  #[error("{message}")]
  Failed { message: String },
}

impl NodeError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}
