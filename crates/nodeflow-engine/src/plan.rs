//! Execution planning: strategy, executed set, and order.

use std::collections::{BTreeMap, HashSet};

use nodeflow_config::Workflow;
use nodeflow_graph::{ContainerMap, Graph};
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
  /// Everything reachable from the start nodes.
  Full,
  /// One selected node and its ancestors.
  Single,
  /// Several selected nodes and their ancestors.
  Selective,
}

impl ExecutionStrategy {
  pub fn for_selection(selection: Option<&[String]>) -> Self {
    match selection.map(<[String]>::len) {
      None | Some(0) => Self::Full,
      Some(1) => Self::Single,
      Some(_) => Self::Selective,
    }
  }
}

/// Everything the main loop needs, computed once before any node runs.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
  strategy: ExecutionStrategy,
  graph: Graph,
  executed: HashSet<String>,
  order: Vec<String>,
  containers: ContainerMap,
}

impl ExecutionPlan {
  /// Validate the workflow and compute the executed set, the main order, and
  /// every container body.
  pub fn build(workflow: &Workflow) -> Result<Self, ExecutionError> {
    let graph = Graph::new(workflow)?;
    let strategy = ExecutionStrategy::for_selection(workflow.selection());

    let executed = match workflow.selection() {
      Some(selected) => {
        let closure = graph.dependency_closure(selected)?;
        reject_unschedulable(&graph, selected)?;
        closure
      }
      None => graph.reachable_from_starts(),
    };

    let order = graph
      .topological_order()?
      .into_iter()
      .filter(|id| executed.contains(id))
      .collect();
    let containers = graph.containers()?;

    Ok(Self {
      strategy,
      graph,
      executed,
      order,
      containers,
    })
  }

  pub fn strategy(&self) -> ExecutionStrategy {
    self.strategy
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// Top-level nodes in the order the main loop runs them.
  pub fn order(&self) -> &[String] {
    &self.order
  }

  pub fn containers(&self) -> &ContainerMap {
    &self.containers
  }

  /// A serializable description of the plan.
  pub fn summary(&self) -> PlanSummary {
    let executed = self
      .graph
      .node_ids()
      .iter()
      .filter(|id| self.executed.contains(*id))
      .cloned()
      .collect();

    PlanSummary {
      strategy: self.strategy,
      executed_node_ids: executed,
      order: self.order.clone(),
      containers: self
        .containers
        .iter()
        .map(|body| (body.container_id.clone(), body.order.clone()))
        .collect(),
    }
  }
}

/// Containers and their members only run through a loop node, so they cannot
/// be selected on their own.
fn reject_unschedulable(graph: &Graph, selected: &[String]) -> Result<(), ExecutionError> {
  for node_id in selected {
    if graph.is_container(node_id) {
      return Err(ExecutionError::InvalidGraph {
        message: format!("selected node '{}' is a container and cannot run on its own", node_id),
      });
    }
    if let Some(container_id) = graph.parent_of(node_id) {
      return Err(ExecutionError::InvalidGraph {
        message: format!(
          "selected node '{}' is inside container '{}'; select the loop node that runs it",
          node_id, container_id
        ),
      });
    }
  }
  Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
  pub strategy: ExecutionStrategy,
  /// Executed set in declaration order.
  pub executed_node_ids: Vec<String>,
  pub order: Vec<String>,
  /// Container ID to the order of its body.
  pub containers: BTreeMap<String, Vec<String>>,
}
