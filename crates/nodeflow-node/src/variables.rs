//! Param resolution using minijinja templates.
//!
//! Node params may reference upstream outputs and loop variables:
//!
//! ```json
//! {
//!   "url": "{{ start.baseUrl }}/search?q={{ item }}",
//!   "retries": "{{ config.retries }}",
//!   "target": "{{ nodes['fetch-1'].selector }}"
//! }
//! ```
//!
//! The template context exposes every node's outputs under its ID, the same
//! map again under `nodes` (for IDs that are not valid identifiers), and the
//! loop variables of the enclosing iterations at the top level.
//!
//! A param that is exactly one `{{ expr }}` is evaluated as an expression and
//! keeps its JSON type; any other string containing template syntax renders
//! to a string.

use std::collections::HashMap;

use minijinja::{Environment, UndefinedBehavior, Value as TemplateValue};
use nodeflow_config::Values;
use serde_json::Value;

use crate::error::NodeError;

/// Loop variables visible to one container execution.
///
/// Immutable: entering a nested loop builds a child scope instead of
/// changing this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopScope {
  bindings: Values,
}

impl LoopScope {
  pub fn new() -> Self {
    Self::default()
  }

  /// A scope with this scope's bindings plus one iteration's item and index.
  pub fn child(&self, item_variable: &str, item: Value, index_variable: &str, index: usize) -> Self {
    let mut bindings = self.bindings.clone();
    bindings.insert(item_variable.to_string(), item);
    bindings.insert(index_variable.to_string(), Value::from(index));
    Self { bindings }
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.bindings.get(name)
  }

  pub fn bindings(&self) -> &Values {
    &self.bindings
  }
}

/// Everything a param reference can see while one node's inputs are
/// resolved.
#[derive(Debug, Clone, Copy)]
pub struct VariableScope<'a> {
  /// Outputs of nodes that have produced them so far, keyed by node ID.
  pub node_outputs: &'a HashMap<String, Values>,
  pub loop_scope: Option<&'a LoopScope>,
}

/// Substitutes references in a node's declared params. A pure data
/// transform.
pub trait VariableResolver: Send + Sync {
  fn resolve_params(
    &self,
    node_id: &str,
    params: &Values,
    scope: &VariableScope<'_>,
  ) -> Result<Values, NodeError>;
}

/// [`VariableResolver`] backed by minijinja.
pub struct TemplateResolver {
  env: Environment<'static>,
}

impl TemplateResolver {
  pub fn new() -> Self {
    let mut env = Environment::new();
    // References to nodes that have not produced output resolve to null.
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    Self { env }
  }

  fn build_context(scope: &VariableScope<'_>) -> TemplateValue {
    let mut context = serde_json::Map::new();
    let mut nodes = serde_json::Map::new();

    for (node_id, outputs) in scope.node_outputs {
      context.insert(node_id.clone(), Value::Object(outputs.clone()));
      nodes.insert(node_id.clone(), Value::Object(outputs.clone()));
    }
    context.insert("nodes".to_string(), Value::Object(nodes));

    if let Some(loop_scope) = scope.loop_scope {
      for (name, value) in loop_scope.bindings() {
        context.insert(name.clone(), value.clone());
      }
    }

    TemplateValue::from_serialize(&context)
  }

  fn resolve_value(
    &self,
    key: &str,
    value: &Value,
    context: &TemplateValue,
  ) -> Result<Value, NodeError> {
    match value {
      Value::String(template) => self.resolve_string(key, template, context),
      Value::Array(items) => items
        .iter()
        .map(|item| self.resolve_value(key, item, context))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array),
      Value::Object(map) => {
        let mut resolved = serde_json::Map::with_capacity(map.len());
        for (k, v) in map {
          resolved.insert(k.clone(), self.resolve_value(key, v, context)?);
        }
        Ok(Value::Object(resolved))
      }
      other => Ok(other.clone()),
    }
  }

  fn resolve_string(
    &self,
    key: &str,
    template: &str,
    context: &TemplateValue,
  ) -> Result<Value, NodeError> {
    if !template.contains("{{") && !template.contains("{%") {
      return Ok(Value::String(template.to_string()));
    }

    let template_error = |e: minijinja::Error| NodeError::Template {
      key: key.to_string(),
      message: e.to_string(),
    };

    if let Some(expr) = single_expression(template) {
      let expression = self.env.compile_expression(expr).map_err(template_error)?;
      let result = expression.eval(context).map_err(template_error)?;
      return serde_json::to_value(&result).map_err(|e| NodeError::Template {
        key: key.to_string(),
        message: e.to_string(),
      });
    }

    self
      .env
      .render_str(template, context)
      .map(Value::String)
      .map_err(template_error)
  }
}

impl Default for TemplateResolver {
  fn default() -> Self {
    Self::new()
  }
}

impl VariableResolver for TemplateResolver {
  fn resolve_params(
    &self,
    _node_id: &str,
    params: &Values,
    scope: &VariableScope<'_>,
  ) -> Result<Values, NodeError> {
    if params.is_empty() {
      return Ok(Values::new());
    }

    let context = Self::build_context(scope);
    let mut resolved = Values::new();
    for (key, value) in params {
      resolved.insert(key.clone(), self.resolve_value(key, value, &context)?);
    }
    Ok(resolved)
  }
}

/// The inner expression of a string that is exactly one `{{ expr }}` block.
fn single_expression(template: &str) -> Option<&str> {
  let inner = template
    .trim()
    .strip_prefix("{{")?
    .strip_suffix("}}")?;
  if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
    return None;
  }
  Some(inner.trim())
}
