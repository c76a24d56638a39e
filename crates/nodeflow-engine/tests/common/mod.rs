#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nodeflow_config::{NodeData, Values, Workflow};
use nodeflow_engine::{CacheStore, ExecutionEvent, WorkflowExecutor};
use nodeflow_node::{CacheContext, Executable, NodeError, NodeRegistry};
use serde_json::Value;
use tokio::sync::{Notify, mpsc};

pub fn workflow(value: Value) -> Workflow {
  serde_json::from_value(value).expect("valid workflow fixture")
}

pub fn values(value: Value) -> Values {
  match value {
    Value::Object(map) => map,
    _ => Values::new(),
  }
}

/// Echoes its inputs plus the number of times it has run.
#[derive(Clone, Default)]
pub struct CountingNode {
  pub calls: Arc<AtomicUsize>,
  pub cacheable: bool,
}

impl CountingNode {
  pub fn cacheable() -> Self {
    Self {
      calls: Arc::default(),
      cacheable: true,
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Executable for CountingNode {
  async fn execute(&self, inputs: &Values, _data: &NodeData) -> Result<Values, NodeError> {
    let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    let mut outputs = inputs.clone();
    outputs.insert("calls".to_string(), Value::from(calls));
    Ok(outputs)
  }

  fn should_cache(&self, _inputs: &Values, _ctx: &CacheContext<'_>) -> bool {
    self.cacheable
  }
}

/// Fails when its `item` input equals the configured value, echoes
/// otherwise.
pub struct FailOnItem(pub Value);

#[async_trait]
impl Executable for FailOnItem {
  async fn execute(&self, inputs: &Values, _data: &NodeData) -> Result<Values, NodeError> {
    if inputs.get("item") == Some(&self.0) {
      return Err(NodeError::failed(format!("boom on {}", self.0)));
    }
    Ok(inputs.clone())
  }
}

/// Signals `entered` when it starts and waits for `release` before
/// finishing.
#[derive(Clone, Default)]
pub struct GateNode {
  pub entered: Arc<Notify>,
  pub release: Arc<Notify>,
}

#[async_trait]
impl Executable for GateNode {
  async fn execute(&self, inputs: &Values, _data: &NodeData) -> Result<Values, NodeError> {
    self.entered.notify_one();
    self.release.notified().await;
    Ok(inputs.clone())
  }
}

pub fn registry_with(register: impl FnOnce(&mut NodeRegistry)) -> NodeRegistry {
  let mut registry = NodeRegistry::with_builtins();
  register(&mut registry);
  registry
}

/// An executor using a private cache so tests do not share results.
pub fn executor_with(registry: NodeRegistry) -> WorkflowExecutor {
  WorkflowExecutor::new(registry).with_cache_store(Arc::new(CacheStore::new()))
}

/// IDs of nodes in the order they started.
pub fn started_order(rx: &mut mpsc::UnboundedReceiver<ExecutionEvent>) -> Vec<String> {
  let mut order = Vec::new();
  while let Ok(event) = rx.try_recv() {
    if let ExecutionEvent::NodeStarted { node_id, .. } = event {
      order.push(node_id);
    }
  }
  order
}
