use async_trait::async_trait;
use nodeflow_config::{NodeData, Values};

use crate::error::NodeError;
use crate::hash::config_hash;

/// How the engine treats a node type beyond running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
  /// Ordinary request/response node.
  Task,
  /// Emits output on one branch handle and null on the others. Downstream
  /// nodes fed only by null branches are skipped.
  Conditional,
  /// Emits a [`LoopDirective`](crate::LoopDirective); the engine runs the
  /// referenced container once per iteration.
  Loop,
}

/// Identifies the node instance a cache decision is made for.
#[derive(Debug, Clone, Copy)]
pub struct CacheContext<'a> {
  pub node_id: &'a str,
  pub workflow_id: &'a str,
}

/// A node type the engine can run.
#[async_trait]
pub trait Executable: Send + Sync {
  /// Run the node against its gathered inputs and return named outputs.
  async fn execute(&self, inputs: &Values, data: &NodeData) -> Result<Values, NodeError>;

  fn kind(&self) -> NodeKind {
    NodeKind::Task
  }

  /// Whether a result for these inputs may be served from, and written to,
  /// the cache. Side-effecting nodes keep the default.
  fn should_cache(&self, _inputs: &Values, _ctx: &CacheContext<'_>) -> bool {
    false
  }

  /// Content hash identifying these inputs and node data.
  fn config_hash(&self, inputs: &Values, data: &NodeData) -> String {
    config_hash(inputs, data)
  }
}
