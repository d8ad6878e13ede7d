//! Single-turn language-model agent.

use std::sync::Arc;

use serde_json::{json, Value};

use super::prompt::PromptTemplate;
use crate::error::AgentError;
use crate::llm::{CompletionOptions, ModelClient, ModelReply};
use crate::state::{AgentOutput, GlobalState, LogEntry};

/// Renders its template, invokes the model once, and stores the reply at
/// `artifacts[output_key]`.
pub struct LlmAgent {
    name: String,
    purpose: String,
    model_name: String,
    template: PromptTemplate,
    output_key: String,
    force_json_output: bool,
    model: Arc<dyn ModelClient>,
}

impl LlmAgent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        model_name: impl Into<String>,
        template: PromptTemplate,
        output_key: impl Into<String>,
        force_json_output: bool,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            model_name: model_name.into(),
            template,
            output_key: output_key.into(),
            force_json_output,
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn execute(&self, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        let prompt = self.template.render(state);
        let options = CompletionOptions {
            json_mode: self.force_json_output,
        };

        tracing::debug!(agent = %self.name, model = %self.model_name, "invoking model");

        let reply = self
            .model
            .complete(&self.model_name, &prompt, &options)
            .await
            .map_err(|e| {
                AgentError::Llm(format!(
                    "LLM invocation failed for model '{}': {e}",
                    self.model_name
                ))
            })?;

        let value = match reply {
            ModelReply::Structured(value) => value,
            ModelReply::Text(text) if self.force_json_output => {
                serde_json::from_str(&text).map_err(|e| {
                    AgentError::Llm(format!(
                        "model '{}' did not return valid JSON: {e}",
                        self.model_name
                    ))
                })?
            }
            ModelReply::Text(text) => Value::String(text),
        };

        Ok(AgentOutput::default()
            .with_artifact(&self.output_key, value)
            .with_message(LogEntry::new(&self.name, "llm").with_detail(json!({
                "model": self.model_name,
                "purpose": self.purpose,
            }))))
    }
}
