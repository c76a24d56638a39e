use async_trait::async_trait;
use nodeflow_config::{NodeData, Values};
use serde_json::{Value, json};

use crate::builtin::setting;
use crate::directive::LoopDirective;
use crate::error::NodeError;
use crate::executable::{Executable, NodeKind};

/// Emits a [`LoopDirective`] over `items` (or `0..count`) for the engine to
/// run against `containerId`.
///
/// Settings: `items` or `count`, `containerId`, `itemVariable`,
/// `indexVariable`, `pageSize`, `currentPage`, `continueOnError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForNode;

#[async_trait]
impl Executable for ForNode {
  async fn execute(&self, inputs: &Values, data: &NodeData) -> Result<Values, NodeError> {
    let items = items(inputs, data)?;
    let iterations = items
      .into_iter()
      .enumerate()
      .map(|(index, item)| json!({ "item": item, "index": index }))
      .collect();

    let directive = LoopDirective {
      iterations,
      container_id: string_setting(inputs, data, "containerId")?,
      item_variable: string_setting(inputs, data, "itemVariable")?
        .unwrap_or_else(|| "item".to_string()),
      index_variable: string_setting(inputs, data, "indexVariable")?
        .unwrap_or_else(|| "index".to_string()),
      page_size: usize_setting(inputs, data, "pageSize")?,
      current_page: usize_setting(inputs, data, "currentPage")?,
      continue_on_error: setting(inputs, data, "continueOnError")
        .and_then(Value::as_bool)
        .unwrap_or(false),
    };

    Ok(directive.to_outputs())
  }

  fn kind(&self) -> NodeKind {
    NodeKind::Loop
  }
}

fn items(inputs: &Values, data: &NodeData) -> Result<Vec<Value>, NodeError> {
  if let Some(items) = setting(inputs, data, "items") {
    return match items {
      Value::Array(items) => Ok(items.clone()),
      other => Err(NodeError::InvalidInput {
        field: "items".to_string(),
        message: format!("expected an array, got {}", other),
      }),
    };
  }

  match usize_setting(inputs, data, "count")? {
    Some(count) => Ok((0..count).map(Value::from).collect()),
    None => Ok(Vec::new()),
  }
}

fn string_setting(inputs: &Values, data: &NodeData, key: &str) -> Result<Option<String>, NodeError> {
  match setting(inputs, data, key) {
    None => Ok(None),
    Some(Value::String(s)) if s.is_empty() => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(other) => Err(NodeError::InvalidInput {
      field: key.to_string(),
      message: format!("expected a string, got {}", other),
    }),
  }
}

fn usize_setting(inputs: &Values, data: &NodeData, key: &str) -> Result<Option<usize>, NodeError> {
  match setting(inputs, data, key) {
    None => Ok(None),
    Some(value) => value
      .as_u64()
      .and_then(|n| usize::try_from(n).ok())
      .map(Some)
      .ok_or_else(|| NodeError::InvalidInput {
        field: key.to_string(),
        message: format!("expected a non-negative integer, got {}", value),
      }),
  }
}
