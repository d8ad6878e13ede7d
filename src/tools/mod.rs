//! Caller-supplied tool registry.
//!
//! Two families live here: pure deterministic functions (`state -> delta`)
//! consumed by `deterministic` agents, and callable tools consumed by the
//! reason-act loop of `tool_using` agents. The registry is supplied at
//! engine construction and never mutated by the core.

pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;
use crate::state::{AgentOutput, GlobalState};

pub use http::{AuthConfig, HttpToolProvider, ProviderConfig, RemoteOperation, RemoteTool,
    ReqwestToolProvider, ToolManifest};

/// Declarative description of a callable tool, shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the accepted arguments.
    #[serde(default)]
    pub parameters: Value,
}

/// A tool invocable from a reason-act loop.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, args: Value) -> Result<Value, AgentError>;
}

pub type DynTool = Arc<dyn Tool>;

/// A pure deterministic function over the process state.
pub type DeterministicFn =
    Arc<dyn Fn(&GlobalState) -> Result<AgentOutput, AgentError> + Send + Sync>;

/// Name-indexed lookup of deterministic functions and tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    functions: HashMap<String, DeterministicFn>,
    tools: HashMap<String, DynTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&GlobalState) -> Result<AgentOutput, AgentError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn register_tool(&mut self, tool: DynTool) {
        self.tools.insert(tool.definition().name, tool);
    }

    pub fn function(&self, name: &str) -> Option<DeterministicFn> {
        self.functions.get(name).cloned()
    }

    pub fn tool(&self, name: &str) -> Option<DynTool> {
        self.tools.get(name).cloned()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
