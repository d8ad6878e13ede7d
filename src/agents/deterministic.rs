//! Pure function agent.

use serde_json::json;

use crate::error::AgentError;
use crate::state::{AgentOutput, GlobalState, LogEntry};
use crate::tools::DeterministicFn;

/// Wraps a registry function `state -> delta` and standardizes its audit
/// trail.
pub struct DeterministicAgent {
    name: String,
    purpose: String,
    function_name: String,
    function: DeterministicFn,
}

impl DeterministicAgent {
    pub(crate) fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        function_name: impl Into<String>,
        function: DeterministicFn,
    ) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            function_name: function_name.into(),
            function,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn execute(&self, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        let mut out = (self.function)(state).map_err(|e| match e {
            AgentError::Function(message) => AgentError::Function(message),
            other => AgentError::Function(format!(
                "'{}' failed: {other}",
                self.function_name
            )),
        })?;
        out.messages.push(
            LogEntry::new(&self.name, "deterministic").with_detail(json!({
                "function": self.function_name,
                "purpose": self.purpose,
            })),
        );
        Ok(out)
    }
}
