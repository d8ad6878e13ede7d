//! agentloom: a generic, reconfigurable orchestrator for multi-agent
//! workflows.
//!
//! A *process* is a directed graph of heterogeneous agents connected by
//! edges, described entirely in a declarative YAML definition; the engine
//! itself is domain-agnostic. Three subsystems carry the execution model:
//!
//! - the DSL loader/validator ([`dsl`]), which turns YAML into a compiled,
//!   reference-checked process;
//! - the safe condition evaluator ([`expr`]), a closed boolean language
//!   over the live state used for routing and termination;
//! - the graph runtime ([`runtime`]), which executes one agent at a time,
//!   deep-merges each delta into an immutable state snapshot, and resolves
//!   outgoing edges in declaration order.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentloom::{Engine, SimulatedModelClient};
//!
//! let engine = Engine::from_yaml(yaml, Arc::new(SimulatedModelClient::default()))?;
//! let final_state = engine.run(initial_context).await;
//! println!("{:?}", final_state.artifacts);
//! ```

pub mod agents;
pub mod dsl;
pub mod error;
pub mod expr;
pub mod llm;
pub mod runtime;
pub mod state;
pub mod tools;

pub use agents::AgentNode;
pub use dsl::{load_file, load_str, AgentSpec, EdgeSpec, ProcessDoc, ProcessSpec, END_NODE};
pub use error::{AgentError, DslError, ExprError};
pub use expr::Condition;
pub use llm::{CompletionOptions, ModelClient, ModelError, ModelReply, SimulatedModelClient};
pub use runtime::{CancelHandle, Engine, EngineBuilder, DEFAULT_TOOL_STEP_LIMIT, DEFAULT_VISIT_LIMIT};
pub use state::{deep_merge, AgentOutput, GlobalState, LogEntry, Section};
pub use tools::{
    DynTool, HttpToolProvider, ReqwestToolProvider, Tool, ToolDefinition, ToolManifest,
    ToolRegistry,
};
