//! Nodeflow Engine
//!
//! Runs a workflow graph node by node.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WorkflowExecutor                        │
//! │  - execute(workflow, options) → ExecutionResult             │
//! │  - pause / resume / stop / state for the bound run          │
//! │  - cache administration                                     │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ExecutionPlan                          │
//! │  - strategy (full / single / selective)                     │
//! │  - executed set, topological order, container bodies        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Node step                             │
//! │  - conditional skip, input gathering, param resolution      │
//! │  - cache lookup, timed execute, cache write                 │
//! │  - loop nodes run their container once per iteration        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nodes run strictly one at a time. Pause and stop are cooperative and take
//! effect between nodes, between loop iterations, and between loop body
//! nodes.
//!
//! # Usage
//!
//! ```ignore
//! use nodeflow_engine::WorkflowExecutor;
//! use nodeflow_node::NodeRegistry;
//!
//! let executor = WorkflowExecutor::new(NodeRegistry::with_builtins());
//! let result = executor.execute(&workflow, ExecutionOptions::default()).await;
//! assert!(result.success);
//! ```

mod cache;
mod context;
mod control;
mod error;
mod events;
mod executor;
mod loops;
mod plan;
mod result;
mod run;

pub use cache::{CacheStats, CacheStore, CachedNodeResult};
pub use context::{
  ExecutionContext, NodeExecutionState, NodeStatus, RunStatus, SKIP_CONTAINER, SKIP_NO_VALID_INPUT,
  SKIP_NOT_EXECUTED, SKIP_NOT_SELECTED,
};
pub use control::RunControl;
pub use error::ExecutionError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionHooks, ExecutionNotifier, NoopNotifier};
pub use executor::WorkflowExecutor;
pub use loops::{IterationRecord, LoopSummary};
pub use plan::{ExecutionPlan, ExecutionStrategy, PlanSummary};
pub use result::{ExecutionResult, ExecutionSnapshot};

pub use nodeflow_config::{ExecutionOptions, Workflow};
