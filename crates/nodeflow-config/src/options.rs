//! Run-level execution options.
//!
//! Options deserialize with per-field defaults, so a partial JSON object is
//! merged over the defaults:
//!
//! ```json
//! { "timeoutMs": 5000, "useCache": false }
//! ```

use serde::{Deserialize, Serialize};

/// Options for a single workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
  /// Per-node execution timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Consult and populate the cache store.
  #[serde(default = "default_use_cache")]
  pub use_cache: bool,
  /// Drop this workflow's cache entries before the run starts.
  #[serde(default)]
  pub clear_cache: bool,
}

fn default_timeout_ms() -> u64 {
  60_000
}

fn default_max_retries() -> u32 {
  3
}

fn default_use_cache() -> bool {
  true
}

impl Default for ExecutionOptions {
  fn default() -> Self {
    Self {
      timeout_ms: default_timeout_ms(),
      max_retries: default_max_retries(),
      use_cache: default_use_cache(),
      clear_cache: false,
    }
  }
}

/// A sparse set of option values to lay over a base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsOverride {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_retries: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub use_cache: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub clear_cache: Option<bool>,
}

impl ExecutionOptions {
  /// Overlay the set fields of `overrides` on these options.
  pub fn merge(mut self, overrides: &OptionsOverride) -> Self {
    if let Some(timeout_ms) = overrides.timeout_ms {
      self.timeout_ms = timeout_ms;
    }
    if let Some(max_retries) = overrides.max_retries {
      self.max_retries = max_retries;
    }
    if let Some(use_cache) = overrides.use_cache {
      self.use_cache = use_cache;
    }
    if let Some(clear_cache) = overrides.clear_cache {
      self.clear_cache = clear_cache;
    }
    self
  }
}
