use async_trait::async_trait;
use nodeflow_config::{NodeData, Values};

use crate::error::NodeError;
use crate::executable::{CacheContext, Executable};

/// Entry point of a workflow. Emits its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartNode;

#[async_trait]
impl Executable for StartNode {
  async fn execute(&self, inputs: &Values, _data: &NodeData) -> Result<Values, NodeError> {
    Ok(inputs.clone())
  }
}

/// Terminal marker. Emits its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndNode;

#[async_trait]
impl Executable for EndNode {
  async fn execute(&self, inputs: &Values, _data: &NodeData) -> Result<Values, NodeError> {
    Ok(inputs.clone())
  }
}

/// Emits its resolved params as outputs. Pure, so results are cacheable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetNode;

#[async_trait]
impl Executable for SetNode {
  async fn execute(&self, inputs: &Values, _data: &NodeData) -> Result<Values, NodeError> {
    Ok(inputs.clone())
  }

  fn should_cache(&self, _inputs: &Values, _ctx: &CacheContext<'_>) -> bool {
    true
  }
}
