//! Nodeflow Node
//!
//! The contract between the execution engine and the node types it runs.
//!
//! - [`Executable`] is the capability interface every node type implements:
//!   execute, cache permission, and content hash.
//! - [`NodeResolver`] maps a node type string to an executable; the
//!   [`NodeRegistry`] lookup table is the standard implementation.
//! - [`VariableResolver`] substitutes `{{ ... }}` references in node params;
//!   [`TemplateResolver`] does so with minijinja.
//! - [`LoopDirective`] is the output shape loop nodes hand to the engine.
//!
//! A handful of built-in node types (`start`, `end`, `if`, `for`, `set`,
//! `wait`) are available through [`NodeRegistry::with_builtins`].

mod builtin;
mod directive;
mod error;
mod executable;
mod hash;
mod registry;
mod variables;

pub use builtin::{EndNode, ForNode, IfNode, SetNode, StartNode, WaitNode};
pub use directive::{LoopDirective, PageWindow};
pub use error::NodeError;
pub use executable::{CacheContext, Executable, NodeKind};
pub use hash::config_hash;
pub use registry::{NodeRegistry, NodeResolver};
pub use variables::{LoopScope, TemplateResolver, VariableResolver, VariableScope};

pub use nodeflow_config::{NodeData, Values};
