//! Nodeflow Graph
//!
//! Pure graph analysis over a [`Workflow`](nodeflow_config::Workflow):
//!
//! - Structural validation (unique IDs, edge and parent references)
//! - Reachability from start nodes (full runs)
//! - Dependency closure of selected nodes (selective runs)
//! - Deterministic topological ordering with cycle detection
//! - Container identification and per-container execution bodies
//!
//! Nothing here executes nodes or holds run state.

mod container;
mod error;
mod graph;
mod topo;

pub use container::{ContainerBody, ContainerMap};
pub use error::GraphError;
pub use graph::Graph;
pub use topo::topological_sort;
