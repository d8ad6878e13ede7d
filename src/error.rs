//! Error types for the process engine.
//!
//! Validation is strict, runtime is forgiving: `DslError` halts engine
//! construction, while `AgentError` and `ExprError` are absorbed by the
//! runtime (converted into `quality.error` deltas and non-matching edges
//! respectively) and never surface to the caller of `run`.

use thiserror::Error;

/// Errors produced while parsing or evaluating a routing condition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    /// The expression could not be tokenized or parsed.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A path starts from something other than `quality`, `artifacts`
    /// or `context`.
    #[error("unknown state root '{0}' (expected quality, artifacts or context)")]
    UnknownRoot(String),

    /// An ordering comparison between values that have no defined order.
    #[error("cannot order {left} against {right}")]
    Incomparable {
        left: &'static str,
        right: &'static str,
    },

    /// `len()` applied to something that has no length.
    #[error("len() applied to {0}")]
    NotAContainer(&'static str),
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// A fault raised out of an agent's `execute`.
///
/// The variant name is the error kind; `Display` renders `<kind>: <message>`,
/// which is the exact string the runtime writes into `quality.error`.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("llm: {0}")]
    Llm(String),

    #[error("function: {0}")]
    Function(String),

    #[error("tool: {0}")]
    Tool(String),

    #[error("http: {0}")]
    Http(String),
}

/// Structural or reference violation in a process definition.
///
/// Raised at load time; the loader produces no partially-built graph.
#[derive(Debug, Error)]
pub enum DslError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read process definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("top-level section '{0}' is missing")]
    MissingSection(&'static str),

    #[error("'{0}' must be a non-empty mapping")]
    InvalidSection(&'static str),

    #[error("'edges' is required when no supervisor agent is declared")]
    MissingEdges,

    #[error("process.{0} is missing")]
    MissingProcessField(&'static str),

    #[error("process.start references unknown agent '{0}'")]
    UnknownStart(String),

    #[error("edges[{index}].from references unknown agent '{name}'")]
    UnknownEdgeSource { index: usize, name: String },

    #[error("edges[{index}].to references unknown agent '{name}'")]
    UnknownEdgeTarget { index: usize, name: String },

    #[error("agent '{agent}': {message}")]
    AgentSpec { agent: String, message: String },

    #[error("agent '{agent}': function '{function}' is not registered")]
    UnknownFunction { agent: String, function: String },

    #[error("agent '{agent}': tool '{tool}' is not registered")]
    UnknownTool { agent: String, tool: String },

    #[error("agent '{agent}': tool manifest '{manifest}' is not declared under 'tools'")]
    UnknownManifest { agent: String, manifest: String },

    #[error("agent '{agent}': available agent '{target}' is not defined")]
    UnknownSupervisorTarget { agent: String, target: String },

    #[error("edges[{index}].condition: {source}")]
    InvalidEdgeCondition { index: usize, source: ExprError },

    #[error("process.done_condition: {source}")]
    InvalidDoneCondition { source: ExprError },
}
