//! Agent kinds and the uniform execution contract.
//!
//! The six kinds form a closed variant sharing one operation:
//! `execute(state) -> delta`. New kinds are added by extending the variant
//! and the loader's dispatch table. Agents never mutate the input state;
//! internal faults surface as `AgentError` and are converted by the
//! runtime into `quality.error` deltas.

mod deterministic;
mod llm;
mod prompt;
mod reflection;
mod supervisor;
mod tool_using;
mod utcp;

pub use deterministic::DeterministicAgent;
pub use llm::LlmAgent;
pub use prompt::PromptTemplate;
pub use reflection::{ReflectionAgent, APPROVED, REFINE};
pub use supervisor::{SupervisorAgent, FINISH};
pub use tool_using::ToolUsingAgent;
pub use utcp::UtcpAgent;

use crate::error::AgentError;
use crate::state::{AgentOutput, GlobalState};

/// A node of the process graph.
pub enum AgentNode {
    Llm(LlmAgent),
    Deterministic(DeterministicAgent),
    Reflection(ReflectionAgent),
    ToolUsing(ToolUsingAgent),
    Supervisor(SupervisorAgent),
    Utcp(UtcpAgent),
}

impl AgentNode {
    pub fn name(&self) -> &str {
        match self {
            AgentNode::Llm(agent) => agent.name(),
            AgentNode::Deterministic(agent) => agent.name(),
            AgentNode::Reflection(agent) => agent.name(),
            AgentNode::ToolUsing(agent) => agent.name(),
            AgentNode::Supervisor(agent) => agent.name(),
            AgentNode::Utcp(agent) => agent.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentNode::Llm(_) => "llm",
            AgentNode::Deterministic(_) => "deterministic",
            AgentNode::Reflection(_) => "reflection",
            AgentNode::ToolUsing(_) => "tool_using",
            AgentNode::Supervisor(_) => "supervisor",
            AgentNode::Utcp(_) => "utcp_agent",
        }
    }

    pub fn as_supervisor(&self) -> Option<&SupervisorAgent> {
        match self {
            AgentNode::Supervisor(agent) => Some(agent),
            _ => None,
        }
    }

    /// Run the agent against the current state, producing a delta.
    pub async fn execute(&self, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        match self {
            AgentNode::Llm(agent) => agent.execute(state).await,
            AgentNode::Deterministic(agent) => agent.execute(state).await,
            AgentNode::Reflection(agent) => agent.execute(state).await,
            AgentNode::ToolUsing(agent) => agent.execute(state).await,
            AgentNode::Supervisor(agent) => agent.execute(state).await,
            AgentNode::Utcp(agent) => agent.execute(state).await,
        }
    }
}

impl std::fmt::Debug for AgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
