use std::collections::{HashMap, HashSet};

use nodeflow_config::WorkflowEdge;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::topo::topological_sort;

/// The loop body owned by one container node.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBody {
  pub container_id: String,
  /// Direct children in declaration order.
  pub children: Vec<String>,
  /// Edges with both ends among the children.
  pub edges: Vec<WorkflowEdge>,
  /// Execution order of the children. Nested containers are left out, the
  /// same way the main pass leaves out top-level containers.
  pub order: Vec<String>,
}

/// Every container in a graph, keyed by container ID.
///
/// Built once per run alongside the main topological order.
#[derive(Debug, Clone, Default)]
pub struct ContainerMap {
  bodies: HashMap<String, ContainerBody>,
}

impl ContainerMap {
  pub(crate) fn build(graph: &Graph) -> Result<Self, GraphError> {
    let mut children_by_container: HashMap<&str, Vec<String>> = HashMap::new();
    for node_id in graph.node_ids() {
      if let Some(parent) = graph.parent_of(node_id) {
        children_by_container
          .entry(parent)
          .or_default()
          .push(node_id.clone());
      }
    }

    let mut bodies = HashMap::with_capacity(children_by_container.len());
    for (container_id, children) in children_by_container {
      let members: HashSet<&str> = children.iter().map(|c| c.as_str()).collect();

      let edges: Vec<WorkflowEdge> = graph
        .edges()
        .iter()
        .filter(|edge| {
          members.contains(edge.source.as_str()) && members.contains(edge.target.as_str())
        })
        .cloned()
        .collect();

      let runnable: Vec<String> = children
        .iter()
        .filter(|child| !graph.is_container(child))
        .cloned()
        .collect();
      let order = topological_sort(
        &runnable,
        edges
          .iter()
          .map(|edge| (edge.source.as_str(), edge.target.as_str())),
      )?;

      bodies.insert(
        container_id.to_string(),
        ContainerBody {
          container_id: container_id.to_string(),
          children,
          edges,
          order,
        },
      );
    }

    Ok(Self { bodies })
  }

  pub fn get(&self, container_id: &str) -> Option<&ContainerBody> {
    self.bodies.get(container_id)
  }

  pub fn len(&self) -> usize {
    self.bodies.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bodies.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ContainerBody> {
    self.bodies.values()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use nodeflow_config::{Workflow, WorkflowNode};

  fn loop_workflow() -> Workflow {
    let mut wf = Workflow::new("wf");
    wf.nodes = vec![
      WorkflowNode::new("s", "start"),
      WorkflowNode::new("loop", "for"),
      WorkflowNode::new("body", "group"),
      WorkflowNode::new("third", "task").with_parent("body"),
      WorkflowNode::new("first", "task").with_parent("body"),
      WorkflowNode::new("second", "task").with_parent("body"),
      WorkflowNode::new("outside", "task"),
    ];
    wf.edges = vec![
      WorkflowEdge::new("s", "loop"),
      WorkflowEdge::new("first", "second"),
      WorkflowEdge::new("second", "third"),
      WorkflowEdge::new("outside", "first"),
    ];
    wf
  }

  #[test]
  fn test_container_body_orders_children_by_internal_edges() {
    let graph = Graph::new(&loop_workflow()).unwrap();
    let containers = graph.containers().unwrap();

    assert_eq!(containers.len(), 1);
    let body = containers.get("body").unwrap();
    assert_eq!(body.children, vec!["third", "first", "second"]);
    assert_eq!(body.order, vec!["first", "second", "third"]);
    assert_eq!(body.edges.len(), 2);
    assert!(body.edges.iter().all(|e| e.source != "outside"));
  }

  #[test]
  fn test_nested_container_is_not_scheduled_in_parent_body() {
    let mut wf = Workflow::new("wf");
    wf.nodes = vec![
      WorkflowNode::new("outer", "group"),
      WorkflowNode::new("inner_loop", "for").with_parent("outer"),
      WorkflowNode::new("inner", "group").with_parent("outer"),
      WorkflowNode::new("leaf", "task").with_parent("inner"),
    ];
    let graph = Graph::new(&wf).unwrap();
    let containers = graph.containers().unwrap();

    assert_eq!(containers.len(), 2);
    assert_eq!(containers.get("outer").unwrap().order, vec!["inner_loop"]);
    assert_eq!(containers.get("inner").unwrap().order, vec!["leaf"]);
  }

  #[test]
  fn test_cyclic_body_is_rejected() {
    let mut wf = Workflow::new("wf");
    wf.nodes = vec![
      WorkflowNode::new("body", "group"),
      WorkflowNode::new("a", "task").with_parent("body"),
      WorkflowNode::new("b", "task").with_parent("body"),
    ];
    wf.edges = vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("b", "a")];
    let graph = Graph::new(&wf).unwrap();

    assert!(matches!(
      graph.containers(),
      Err(GraphError::CyclicDependency { .. })
    ));
  }
}
