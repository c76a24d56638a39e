//! The loop node output contract.
//!
//! A loop node's outputs carry the iteration list, the container that holds
//! the loop body, and the variable names each iteration binds:
//!
//! ```json
//! {
//!   "iterations": [{ "item": "a", "index": 0 }, { "item": "b", "index": 1 }],
//!   "containerId": "body",
//!   "itemVariable": "item",
//!   "indexVariable": "index",
//!   "pageSize": 10,
//!   "currentPage": 1,
//!   "continueOnError": false
//! }
//! ```

use nodeflow_config::Values;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopDirective {
  #[serde(default)]
  pub iterations: Vec<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container_id: Option<String>,
  #[serde(default = "default_item_variable")]
  pub item_variable: String,
  #[serde(default = "default_index_variable")]
  pub index_variable: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_size: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub current_page: Option<usize>,
  #[serde(default)]
  pub continue_on_error: bool,
}

fn default_item_variable() -> String {
  "item".to_string()
}

fn default_index_variable() -> String {
  "index".to_string()
}

/// The slice of iterations one loop execution runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
  /// First iteration index, inclusive.
  pub start: usize,
  /// Last iteration index, exclusive.
  pub end: usize,
  pub page: usize,
  pub page_size: usize,
  pub total_pages: usize,
}

impl PageWindow {
  pub fn len(&self) -> usize {
    self.end - self.start
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }
}

impl LoopDirective {
  pub fn new(iterations: Vec<Value>, container_id: impl Into<String>) -> Self {
    Self {
      iterations,
      container_id: Some(container_id.into()),
      item_variable: default_item_variable(),
      index_variable: default_index_variable(),
      page_size: None,
      current_page: None,
      continue_on_error: false,
    }
  }

  /// Read a directive from a loop node's outputs.
  pub fn from_outputs(outputs: &Values) -> Result<Self, serde_json::Error> {
    serde_json::from_value(Value::Object(outputs.clone()))
  }

  pub fn to_outputs(&self) -> Values {
    match serde_json::to_value(self) {
      Ok(Value::Object(map)) => map,
      _ => Values::new(),
    }
  }

  /// The iteration window to run.
  ///
  /// With a page size, page `p` covers `[(p-1)*size, min(p*size, total))`
  /// and pages count from 1. Without one, the window is the full list.
  pub fn window(&self) -> PageWindow {
    let total = self.iterations.len();
    match self.page_size.filter(|size| *size > 0) {
      Some(page_size) => {
        let page = self.current_page.unwrap_or(1).max(1);
        let start = ((page - 1).saturating_mul(page_size)).min(total);
        let end = page.saturating_mul(page_size).min(total);
        PageWindow {
          start,
          end,
          page,
          page_size,
          total_pages: total.div_ceil(page_size),
        }
      }
      None => PageWindow {
        start: 0,
        end: total,
        page: 1,
        page_size: total,
        total_pages: usize::from(total > 0),
      },
    }
  }

  /// The value bound to the item variable for an iteration: the iteration's
  /// `item` field when it is an object carrying one, otherwise the iteration
  /// itself.
  pub fn item_of(iteration: &Value) -> Value {
    match iteration {
      Value::Object(map) if map.contains_key("item") => map["item"].clone(),
      other => other.clone(),
    }
  }
}
