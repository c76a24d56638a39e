use std::collections::HashMap;
use std::sync::Arc;

use crate::builtin;
use crate::executable::Executable;

/// Maps a node type string to the executable that runs it.
pub trait NodeResolver: Send + Sync {
  /// `None` when no executor is registered for the type.
  fn resolve(&self, node_type: &str) -> Option<Arc<dyn Executable>>;
}

/// Lookup table of node executors, populated at startup.
#[derive(Clone, Default)]
pub struct NodeRegistry {
  executors: HashMap<String, Arc<dyn Executable>>,
}

impl NodeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding the built-in node types.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    builtin::register_all(&mut registry);
    registry
  }

  /// Register an executor, replacing any previous one for the type.
  pub fn register(
    &mut self,
    node_type: impl Into<String>,
    executor: impl Executable + 'static,
  ) -> &mut Self {
    self.executors.insert(node_type.into(), Arc::new(executor));
    self
  }

  /// Builder form of [`NodeRegistry::register`].
  pub fn with(mut self, node_type: impl Into<String>, executor: impl Executable + 'static) -> Self {
    self.register(node_type, executor);
    self
  }

  /// Registered type names, sorted.
  pub fn types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.executors.keys().map(|k| k.as_str()).collect();
    types.sort_unstable();
    types
  }
}

impl NodeResolver for NodeRegistry {
  fn resolve(&self, node_type: &str) -> Option<Arc<dyn Executable>> {
    self.executors.get(node_type).cloned()
  }
}

impl std::fmt::Debug for NodeRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NodeRegistry")
      .field("types", &self.types())
      .finish()
  }
}
