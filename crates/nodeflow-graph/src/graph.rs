use std::collections::{HashMap, HashSet, VecDeque};

use nodeflow_config::{Workflow, WorkflowEdge};

use crate::container::ContainerMap;
use crate::error::GraphError;
use crate::topo::topological_sort;

/// Validated graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Node IDs in declaration order.
  nodes: Vec<String>,
  edges: Vec<WorkflowEdge>,
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Incoming edges per target node, in declaration order.
  incoming: HashMap<String, Vec<WorkflowEdge>>,
  /// Child -> container it belongs to.
  parents: HashMap<String, String>,
  /// Nodes referenced as another node's parent.
  containers: HashSet<String>,
  start_nodes: Vec<String>,
}

impl Graph {
  /// Build a graph from a workflow, rejecting duplicate IDs and dangling
  /// edge or parent references.
  pub fn new(workflow: &Workflow) -> Result<Self, GraphError> {
    let mut nodes = Vec::with_capacity(workflow.nodes.len());
    let mut known = HashSet::with_capacity(workflow.nodes.len());
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in &workflow.nodes {
      if !known.insert(node.id.as_str()) {
        return Err(GraphError::DuplicateNode(node.id.clone()));
      }
      nodes.push(node.id.clone());
      adjacency.entry(node.id.clone()).or_default();
      reverse_adjacency.entry(node.id.clone()).or_default();
    }

    let mut incoming: HashMap<String, Vec<WorkflowEdge>> = HashMap::new();
    for edge in &workflow.edges {
      if !known.contains(edge.source.as_str()) || !known.contains(edge.target.as_str()) {
        return Err(GraphError::InvalidEdge {
          from: edge.source.clone(),
          to: edge.target.clone(),
        });
      }
      adjacency
        .entry(edge.source.clone())
        .or_default()
        .push(edge.target.clone());
      reverse_adjacency
        .entry(edge.target.clone())
        .or_default()
        .push(edge.source.clone());
      incoming
        .entry(edge.target.clone())
        .or_default()
        .push(edge.clone());
    }

    let mut parents = HashMap::new();
    let mut containers = HashSet::new();
    for node in &workflow.nodes {
      if let Some(parent) = &node.parent_node {
        if !known.contains(parent.as_str()) {
          return Err(GraphError::UnknownParent {
            node_id: node.id.clone(),
            parent: parent.clone(),
          });
        }
        parents.insert(node.id.clone(), parent.clone());
        containers.insert(parent.clone());
      }
    }

    let start_nodes = workflow
      .nodes
      .iter()
      .filter(|node| node.is_start())
      .map(|node| node.id.clone())
      .collect();

    Ok(Self {
      nodes,
      edges: workflow.edges.clone(),
      adjacency,
      reverse_adjacency,
      incoming,
      parents,
      containers,
      start_nodes,
    })
  }

  /// All node IDs in declaration order.
  pub fn node_ids(&self) -> &[String] {
    &self.nodes
  }

  pub fn edges(&self) -> &[WorkflowEdge] {
    &self.edges
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.adjacency.contains_key(node_id)
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Edges whose target is the given node.
  pub fn incoming_edges(&self, node_id: &str) -> &[WorkflowEdge] {
    self
      .incoming
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Nodes flagged as start nodes, in declaration order.
  pub fn start_nodes(&self) -> &[String] {
    &self.start_nodes
  }

  pub fn is_container(&self, node_id: &str) -> bool {
    self.containers.contains(node_id)
  }

  /// The container a node belongs to, if any.
  pub fn parent_of(&self, node_id: &str) -> Option<&str> {
    self.parents.get(node_id).map(|s| s.as_str())
  }

  /// Nodes reachable by following outgoing edges from every start node.
  ///
  /// Start nodes are part of the set. No start nodes yields an empty set.
  pub fn reachable_from_starts(&self) -> HashSet<String> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for start in &self.start_nodes {
      if visited.insert(start.clone()) {
        queue.push_back(start);
      }
    }

    while let Some(current) = queue.pop_front() {
      for next in self.downstream(current) {
        if visited.insert(next.clone()) {
          queue.push_back(next);
        }
      }
    }

    visited
  }

  /// The selected nodes plus every ancestor reachable through incoming edges.
  pub fn dependency_closure(&self, selected: &[String]) -> Result<HashSet<String>, GraphError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<&str> = Vec::new();

    for node_id in selected {
      if !self.contains(node_id) {
        return Err(GraphError::NodeNotFound(node_id.clone()));
      }
      if visited.insert(node_id.clone()) {
        stack.push(node_id);
      }
    }

    while let Some(current) = stack.pop() {
      for prev in self.upstream(current) {
        if visited.insert(prev.clone()) {
          stack.push(prev);
        }
      }
    }

    Ok(visited)
  }

  /// Nodes the main loop may schedule: neither a container nor a member of
  /// one.
  pub fn schedulable_nodes(&self) -> Vec<String> {
    self
      .nodes
      .iter()
      .filter(|id| !self.is_container(id) && !self.parents.contains_key(*id))
      .cloned()
      .collect()
  }

  /// Reject cycles among all non-container nodes, container members
  /// included, over every edge that does not touch a container. This covers
  /// cycles that leave a container body and re-enter it.
  pub fn check_acyclic(&self) -> Result<(), GraphError> {
    let non_containers: Vec<String> = self
      .nodes
      .iter()
      .filter(|id| !self.is_container(id))
      .cloned()
      .collect();
    let edges = self
      .edges
      .iter()
      .filter(|edge| !self.is_container(&edge.source) && !self.is_container(&edge.target))
      .map(|edge| (edge.source.as_str(), edge.target.as_str()));
    topological_sort(&non_containers, edges).map(|_| ())
  }

  /// Topological order of all schedulable nodes.
  ///
  /// Edges touching a container or a container member are left out; those
  /// subgraphs are ordered per container by [`Graph::containers`]. Fails on
  /// any cycle [`Graph::check_acyclic`] would reject.
  pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
    self.check_acyclic()?;
    let schedulable = self.schedulable_nodes();
    let edges = self
      .edges
      .iter()
      .filter(|edge| !self.is_container(&edge.source) && !self.is_container(&edge.target))
      .map(|edge| (edge.source.as_str(), edge.target.as_str()));
    topological_sort(&schedulable, edges)
  }

  /// Build the explicit container structure for this graph.
  pub fn containers(&self) -> Result<ContainerMap, GraphError> {
    ContainerMap::build(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use nodeflow_config::WorkflowNode;

  fn workflow(nodes: Vec<WorkflowNode>, edges: &[(&str, &str)]) -> Workflow {
    let mut wf = Workflow::new("wf");
    wf.nodes = nodes;
    wf.edges = edges
      .iter()
      .map(|(s, t)| WorkflowEdge::new(*s, *t))
      .collect();
    wf
  }

  fn set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_reachability_follows_outgoing_chains() {
    let wf = workflow(
      vec![
        WorkflowNode::new("s", "start"),
        WorkflowNode::new("a", "task"),
        WorkflowNode::new("b", "task"),
        WorkflowNode::new("island", "task"),
        WorkflowNode::new("feeds_a", "task"),
      ],
      &[("s", "a"), ("a", "b"), ("feeds_a", "a")],
    );
    let graph = Graph::new(&wf).unwrap();

    assert_eq!(graph.reachable_from_starts(), set(&["s", "a", "b"]));
  }

  #[test]
  fn test_reachability_unions_multiple_starts() {
    let mut wf = workflow(
      vec![
        WorkflowNode::new("s1", "start"),
        WorkflowNode::new("s2", "task"),
        WorkflowNode::new("a", "task"),
        WorkflowNode::new("b", "task"),
      ],
      &[("s1", "a"), ("s2", "b")],
    );
    wf.nodes[1].data.is_start = true;
    let graph = Graph::new(&wf).unwrap();

    assert_eq!(graph.start_nodes().len(), 2);
    assert_eq!(graph.reachable_from_starts(), set(&["s1", "s2", "a", "b"]));
  }

  #[test]
  fn test_no_start_nodes_reaches_nothing() {
    let wf = workflow(
      vec![WorkflowNode::new("a", "task"), WorkflowNode::new("b", "task")],
      &[("a", "b")],
    );
    let graph = Graph::new(&wf).unwrap();

    assert!(graph.reachable_from_starts().is_empty());
  }

  #[test]
  fn test_dependency_closure_collects_ancestors() {
    let wf = workflow(
      vec![
        WorkflowNode::new("s", "start"),
        WorkflowNode::new("a", "task"),
        WorkflowNode::new("b", "task"),
        WorkflowNode::new("c", "task"),
        WorkflowNode::new("sibling", "task"),
      ],
      &[("s", "a"), ("a", "b"), ("b", "c"), ("s", "sibling")],
    );
    let graph = Graph::new(&wf).unwrap();

    let closure = graph.dependency_closure(&["b".to_string()]).unwrap();
    assert_eq!(closure, set(&["s", "a", "b"]));
  }

  #[test]
  fn test_dependency_closure_survives_cycles() {
    let wf = workflow(
      vec![WorkflowNode::new("a", "task"), WorkflowNode::new("b", "task")],
      &[("a", "b"), ("b", "a")],
    );
    let graph = Graph::new(&wf).unwrap();

    let closure = graph.dependency_closure(&["a".to_string()]).unwrap();
    assert_eq!(closure, set(&["a", "b"]));
  }

  #[test]
  fn test_dependency_closure_rejects_unknown_selection() {
    let wf = workflow(vec![WorkflowNode::new("a", "task")], &[]);
    let graph = Graph::new(&wf).unwrap();

    assert!(matches!(
      graph.dependency_closure(&["missing".to_string()]),
      Err(GraphError::NodeNotFound(_))
    ));
  }

  #[test]
  fn test_rejects_dangling_edge() {
    let wf = workflow(vec![WorkflowNode::new("a", "task")], &[("a", "ghost")]);
    assert!(matches!(
      Graph::new(&wf),
      Err(GraphError::InvalidEdge { .. })
    ));
  }

  #[test]
  fn test_rejects_unknown_parent() {
    let wf = workflow(
      vec![WorkflowNode::new("a", "task").with_parent("ghost")],
      &[],
    );
    assert!(matches!(
      Graph::new(&wf),
      Err(GraphError::UnknownParent { .. })
    ));
  }

  #[test]
  fn test_rejects_duplicate_ids() {
    let wf = workflow(
      vec![WorkflowNode::new("a", "task"), WorkflowNode::new("a", "task")],
      &[],
    );
    assert!(matches!(Graph::new(&wf), Err(GraphError::DuplicateNode(_))));
  }

  #[test]
  fn test_topological_order_excludes_containers_and_members() {
    let wf = workflow(
      vec![
        WorkflowNode::new("s", "start"),
        WorkflowNode::new("loop", "for"),
        WorkflowNode::new("body", "group"),
        WorkflowNode::new("inner", "task").with_parent("body"),
        WorkflowNode::new("after", "task"),
      ],
      &[("s", "loop"), ("loop", "body"), ("body", "after"), ("loop", "after")],
    );
    let graph = Graph::new(&wf).unwrap();

    assert!(graph.is_container("body"));
    assert_eq!(graph.parent_of("inner"), Some("body"));
    assert_eq!(
      graph.topological_order().unwrap(),
      vec!["s".to_string(), "loop".to_string(), "after".to_string()]
    );
  }

  #[test]
  fn test_topological_order_detects_cycle() {
    let wf = workflow(
      vec![
        WorkflowNode::new("s", "start"),
        WorkflowNode::new("a", "task"),
        WorkflowNode::new("b", "task"),
      ],
      &[("s", "a"), ("a", "b"), ("b", "a")],
    );
    let graph = Graph::new(&wf).unwrap();

    assert!(matches!(
      graph.topological_order(),
      Err(GraphError::CyclicDependency { .. })
    ));
  }

  #[test]
  fn test_cycle_through_container_is_ignored() {
    let wf = workflow(
      vec![
        WorkflowNode::new("a", "task"),
        WorkflowNode::new("body", "group"),
        WorkflowNode::new("child", "task").with_parent("body"),
      ],
      &[("a", "body"), ("body", "a")],
    );
    let graph = Graph::new(&wf).unwrap();

    assert_eq!(graph.topological_order().unwrap(), vec!["a".to_string()]);
  }

  #[test]
  fn test_cycle_through_container_member_is_rejected() {
    let wf = workflow(
      vec![
        WorkflowNode::new("s", "start"),
        WorkflowNode::new("a", "task"),
        WorkflowNode::new("body", "group"),
        WorkflowNode::new("child", "task").with_parent("body"),
      ],
      &[("s", "a"), ("a", "child"), ("child", "a")],
    );
    let graph = Graph::new(&wf).unwrap();

    match graph.check_acyclic() {
      Err(GraphError::CyclicDependency { nodes }) => {
        assert_eq!(nodes, vec!["a".to_string(), "child".to_string()]);
      }
      other => panic!("expected cyclic dependency, got {:?}", other),
    }
    assert!(graph.topological_order().is_err());
  }

  #[test]
  fn test_edges_into_container_members_are_acyclic() {
    let wf = workflow(
      vec![
        WorkflowNode::new("s", "start"),
        WorkflowNode::new("body", "group"),
        WorkflowNode::new("child", "task").with_parent("body"),
        WorkflowNode::new("after", "task"),
      ],
      &[("s", "child"), ("child", "after")],
    );
    let graph = Graph::new(&wf).unwrap();

    assert!(graph.check_acyclic().is_ok());
  }
}
