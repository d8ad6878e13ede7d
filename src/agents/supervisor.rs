//! Dynamic routing agent.

use std::sync::Arc;

use serde_json::json;

use super::prompt::PromptTemplate;
use crate::error::AgentError;
use crate::llm::{CompletionOptions, ModelClient};
use crate::state::{AgentOutput, GlobalState, LogEntry};

/// Sentinel a supervisor emits to end the process.
pub const FINISH: &str = "FINISH";

/// Asks the model to pick the next node from `available_agents` (or
/// `FINISH`) and writes the selection to `quality.next_agent`. Routing is
/// then carried out by ordinary edge evaluation.
pub struct SupervisorAgent {
    name: String,
    purpose: String,
    model_name: String,
    template: PromptTemplate,
    available_agents: Vec<String>,
    model: Arc<dyn ModelClient>,
}

impl SupervisorAgent {
    pub(crate) fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        model_name: impl Into<String>,
        template: PromptTemplate,
        available_agents: Vec<String>,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            model_name: model_name.into(),
            template,
            available_agents,
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_agents(&self) -> &[String] {
        &self.available_agents
    }

    pub(crate) async fn execute(&self, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        let mut prompt = self.template.render(state);
        prompt.push_str("\n\nAvailable agents:\n");
        for agent in &self.available_agents {
            prompt.push_str(&format!("- {agent}\n"));
        }
        prompt.push_str("\nReply with exactly one agent name, or FINISH when the work is done.");

        let reply = self
            .model
            .complete(&self.model_name, &prompt, &CompletionOptions::default())
            .await
            .map_err(|e| {
                AgentError::Llm(format!(
                    "LLM invocation failed for model '{}': {e}",
                    self.model_name
                ))
            })?;

        let text = reply.into_text();
        let selection = self.interpret(&text)?;

        tracing::debug!(agent = %self.name, selection = %selection, "supervisor routed");

        Ok(AgentOutput::default()
            .with_quality("next_agent", json!(selection))
            .with_message(LogEntry::new(&self.name, "supervisor").with_detail(json!({
                "model": self.model_name,
                "purpose": self.purpose,
                "selected": selection,
            }))))
    }

    /// Exact match first, then case-insensitive containment.
    fn interpret(&self, reply: &str) -> Result<String, AgentError> {
        let choice = reply.trim();
        if choice == FINISH {
            return Ok(FINISH.to_string());
        }
        if let Some(exact) = self.available_agents.iter().find(|a| *a == choice) {
            return Ok(exact.clone());
        }

        let lowered = choice.to_lowercase();
        if lowered.contains(&FINISH.to_lowercase()) {
            return Ok(FINISH.to_string());
        }
        for agent in &self.available_agents {
            if lowered.contains(&agent.to_lowercase()) {
                return Ok(agent.clone());
            }
        }

        Err(AgentError::Llm(format!(
            "supervisor '{}' selected unknown agent '{choice}'",
            self.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::llm::{ModelError, ModelReply};

    struct OneReply(&'static str);

    #[async_trait]
    impl ModelClient for OneReply {
        async fn complete(
            &self,
            _model: &str,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<ModelReply, ModelError> {
            // The routing prompt must present the options.
            assert!(prompt.contains("Available agents:"));
            Ok(ModelReply::Text(self.0.to_string()))
        }

        fn name(&self) -> &str {
            "one-reply"
        }
    }

    fn supervisor(reply: &'static str) -> SupervisorAgent {
        SupervisorAgent::new(
            "coordinator",
            "Route the work",
            "test-model",
            PromptTemplate::new("Decide the next step. Done so far: {artifacts}"),
            vec!["worker_a".into(), "worker_b".into()],
            Arc::new(OneReply(reply)),
        )
    }

    #[tokio::test]
    async fn exact_selection_is_written_to_quality() {
        let out = supervisor("worker_a")
            .execute(&GlobalState::default())
            .await
            .unwrap();
        assert_eq!(
            out.quality.unwrap().get("next_agent"),
            Some(&json!("worker_a"))
        );
    }

    #[tokio::test]
    async fn finish_sentinel_passes_through() {
        let out = supervisor("FINISH")
            .execute(&GlobalState::default())
            .await
            .unwrap();
        assert_eq!(out.quality.unwrap().get("next_agent"), Some(&json!("FINISH")));
    }

    #[tokio::test]
    async fn containment_fallback_matches_verbose_replies() {
        let out = supervisor("I think worker_b should go next.")
            .execute(&GlobalState::default())
            .await
            .unwrap();
        assert_eq!(
            out.quality.unwrap().get("next_agent"),
            Some(&json!("worker_b"))
        );
    }

    #[tokio::test]
    async fn unknown_selection_is_an_error() {
        let err = supervisor("worker_c")
            .execute(&GlobalState::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown agent"));
    }
}
