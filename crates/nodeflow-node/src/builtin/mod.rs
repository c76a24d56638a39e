//! Built-in node types.
//!
//! Each reads its settings from the gathered inputs first (resolved params
//! land there) and falls back to `data.config`.

mod branch;
mod each;
mod passthrough;
mod wait;

pub use branch::IfNode;
pub use each::ForNode;
pub use passthrough::{EndNode, SetNode, StartNode};
pub use wait::WaitNode;

use nodeflow_config::{NodeData, Values};
use serde_json::Value;

use crate::registry::NodeRegistry;

pub(crate) fn register_all(registry: &mut NodeRegistry) {
  registry
    .register("start", StartNode)
    .register("end", EndNode)
    .register("if", IfNode)
    .register("for", ForNode)
    .register("set", SetNode)
    .register("wait", WaitNode);
}

/// A setting from the inputs, or from the node's config object.
fn setting<'a>(inputs: &'a Values, data: &'a NodeData, key: &str) -> Option<&'a Value> {
  inputs
    .get(key)
    .or_else(|| data.config.as_object().and_then(|config| config.get(key)))
    .filter(|value| !value.is_null())
}

#[cfg(test)]
pub(crate) fn values(value: Value) -> Values {
  match value {
    Value::Object(map) => map,
    _ => Values::new(),
  }
}
