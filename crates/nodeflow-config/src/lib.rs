//! Nodeflow Config
//!
//! This crate contains the serializable workflow types for nodeflow. A
//! workflow is the node-and-edge graph produced by the visual editor; the
//! engine reads it without mutating it.
//!
//! Workflows are exchanged as JSON with camelCase keys:
//!
//! ```json
//! {
//!   "workflowId": "wf-1",
//!   "nodes": [
//!     { "id": "start", "type": "start", "data": { "config": {} } },
//!     { "id": "open", "type": "navigate", "data": { "params": { "url": "{{ start.url }}" } } }
//!   ],
//!   "edges": [{ "source": "start", "target": "open" }]
//! }
//! ```

mod edge;
mod node;
mod options;
mod workflow;

pub use edge::WorkflowEdge;
pub use node::{NodeData, START_NODE_TYPE, WorkflowNode};
pub use options::{ExecutionOptions, OptionsOverride};
pub use workflow::Workflow;

/// Named values flowing into or out of a node, keyed by handle name.
pub type Values = serde_json::Map<String, serde_json::Value>;
