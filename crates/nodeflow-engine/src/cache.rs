//! Content-addressed node result cache.
//!
//! Entries are keyed by workflow ID, then node ID, and hold the last
//! successful result for that node together with the hash of the inputs it
//! was computed from. A lookup only hits when the hash matches.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use nodeflow_config::Values;
use serde::{Deserialize, Serialize};

use crate::context::NodeStatus;

/// A cached successful node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedNodeResult {
  pub node_id: String,
  pub status: NodeStatus,
  pub timestamp: DateTime<Utc>,
  pub outputs: Values,
  pub inputs: Values,
  pub duration_ms: u64,
  pub config_hash: String,
}

/// Cache statistics for one workflow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
  /// Node count of the most recent run of the workflow.
  pub total_nodes: usize,
  pub cached_nodes: usize,
  pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct WorkflowCache {
  entries: HashMap<String, CachedNodeResult>,
  total_nodes: usize,
}

/// Thread-safe store of cached node results.
#[derive(Debug, Default)]
pub struct CacheStore {
  workflows: RwLock<HashMap<String, WorkflowCache>>,
}

static SHARED: OnceLock<Arc<CacheStore>> = OnceLock::new();

impl CacheStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// The process-wide store. Executors use it unless given their own.
  pub fn shared() -> Arc<CacheStore> {
    SHARED.get_or_init(|| Arc::new(CacheStore::new())).clone()
  }

  fn read(&self) -> RwLockReadGuard<'_, HashMap<String, WorkflowCache>> {
    self.workflows.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, WorkflowCache>> {
    self.workflows.write().unwrap_or_else(|e| e.into_inner())
  }

  /// The cached result for a node, whatever its hash.
  pub fn get(&self, workflow_id: &str, node_id: &str) -> Option<CachedNodeResult> {
    self
      .read()
      .get(workflow_id)
      .and_then(|wf| wf.entries.get(node_id))
      .cloned()
  }

  /// The cached result for a node, only if it was computed from inputs with
  /// the given hash.
  pub fn lookup(&self, workflow_id: &str, node_id: &str, config_hash: &str) -> Option<CachedNodeResult> {
    self
      .get(workflow_id, node_id)
      .filter(|entry| entry.config_hash == config_hash)
  }

  /// Store a result, replacing any previous entry for the node.
  pub fn put(&self, workflow_id: &str, result: CachedNodeResult) {
    self
      .write()
      .entry(workflow_id.to_string())
      .or_default()
      .entries
      .insert(result.node_id.clone(), result);
  }

  pub fn clear_workflow(&self, workflow_id: &str) {
    if let Some(wf) = self.write().get_mut(workflow_id) {
      wf.entries.clear();
    }
  }

  pub fn clear_all(&self) {
    self.write().clear();
  }

  /// Remember the node count of the latest run, used as the stats
  /// denominator.
  pub fn record_run(&self, workflow_id: &str, total_nodes: usize) {
    self
      .write()
      .entry(workflow_id.to_string())
      .or_default()
      .total_nodes = total_nodes;
  }

  pub fn stats(&self, workflow_id: &str) -> CacheStats {
    let workflows = self.read();
    let Some(wf) = workflows.get(workflow_id) else {
      return CacheStats {
        total_nodes: 0,
        cached_nodes: 0,
        hit_rate: 0.0,
      };
    };

    let cached_nodes = wf.entries.len();
    let hit_rate = if wf.total_nodes == 0 {
      0.0
    } else {
      cached_nodes as f64 / wf.total_nodes as f64
    };

    CacheStats {
      total_nodes: wf.total_nodes,
      cached_nodes,
      hit_rate,
    }
  }
}
