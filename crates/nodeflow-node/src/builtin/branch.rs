use async_trait::async_trait;
use nodeflow_config::{NodeData, Values};
use serde_json::Value;

use crate::builtin::setting;
use crate::error::NodeError;
use crate::executable::{Executable, NodeKind};

/// Routes `value` (default `true`) to the `true` or `false` handle depending
/// on `condition`. The inactive handle carries null.
#[derive(Debug, Clone, Copy, Default)]
pub struct IfNode;

#[async_trait]
impl Executable for IfNode {
  async fn execute(&self, inputs: &Values, data: &NodeData) -> Result<Values, NodeError> {
    let condition = setting(inputs, data, "condition").is_some_and(is_truthy);
    let payload = setting(inputs, data, "value")
      .cloned()
      .unwrap_or(Value::Bool(true));

    let (on_true, on_false) = if condition {
      (payload, Value::Null)
    } else {
      (Value::Null, payload)
    };

    let mut outputs = Values::new();
    outputs.insert("true".to_string(), on_true);
    outputs.insert("false".to_string(), on_false);
    outputs.insert("condition".to_string(), Value::Bool(condition));
    Ok(outputs)
  }

  fn kind(&self) -> NodeKind {
    NodeKind::Conditional
  }
}

fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
    Value::String(s) => !s.is_empty() && s != "false",
    Value::Array(items) => !items.is_empty(),
    Value::Object(map) => !map.is_empty(),
  }
}
