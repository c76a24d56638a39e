use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("edge references unknown node: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  #[error("node '{node_id}' references unknown parent node '{parent}'")]
  UnknownParent { node_id: String, parent: String },

  #[error("cyclic dependency detected among nodes: {}", nodes.join(", "))]
  CyclicDependency { nodes: Vec<String> },
}
