use std::time::Duration;

use async_trait::async_trait;
use nodeflow_config::{NodeData, Values};
use serde_json::Value;
use tracing::debug;

use crate::builtin::setting;
use crate::error::NodeError;
use crate::executable::Executable;

/// Sleeps for `ms` milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitNode;

#[async_trait]
impl Executable for WaitNode {
  async fn execute(&self, inputs: &Values, data: &NodeData) -> Result<Values, NodeError> {
    let ms = match setting(inputs, data, "ms") {
      None => 0,
      Some(value) => value.as_u64().ok_or_else(|| NodeError::InvalidInput {
        field: "ms".to_string(),
        message: format!("expected a non-negative integer, got {}", value),
      })?,
    };

    debug!(ms, "wait_node_sleeping");
    tokio::time::sleep(Duration::from_millis(ms)).await;

    let mut outputs = Values::new();
    outputs.insert("waitedMs".to_string(), Value::from(ms));
    Ok(outputs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builtin::values;
  use serde_json::json;

  #[tokio::test]
  async fn test_wait_reports_duration() {
    let outputs = WaitNode
      .execute(&values(json!({ "ms": 5 })), &NodeData::default())
      .await
      .unwrap();
    assert_eq!(outputs["waitedMs"], json!(5));
  }

  #[tokio::test]
  async fn test_wait_rejects_negative_ms() {
    let err = WaitNode
      .execute(&values(json!({ "ms": -1 })), &NodeData::default())
      .await
      .unwrap_err();
    assert!(matches!(err, NodeError::InvalidInput { ref field, .. } if field == "ms"));
  }
}
