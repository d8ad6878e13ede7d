//! Offline model client producing reproducible, auditable output.
//!
//! Lets a process definition run end-to-end without credentials: the reply
//! carries a header identifying the model and a truncated view of the
//! prompt, followed by a canned completion.

use async_trait::async_trait;
use serde_json::json;

use super::client::{CompletionOptions, ModelClient, ModelError, ModelReply};

const PROMPT_PREVIEW_LIMIT: usize = 3000;

/// Deterministic stand-in for a real provider.
#[derive(Debug, Clone)]
pub struct SimulatedModelClient {
    completion: String,
}

impl Default for SimulatedModelClient {
    fn default() -> Self {
        Self {
            completion: "Generated content based on the provided briefing and context.".into(),
        }
    }
}

impl SimulatedModelClient {
    pub fn new(completion: impl Into<String>) -> Self {
        Self {
            completion: completion.into(),
        }
    }
}

#[async_trait]
impl ModelClient for SimulatedModelClient {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ModelReply, ModelError> {
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_LIMIT).collect();
        if options.json_mode {
            return Ok(ModelReply::Structured(json!({
                "model": model,
                "summary": self.completion,
            })));
        }
        Ok(ModelReply::Text(format!(
            "[simulated:{model}]\n{preview}\n\n{completion}",
            completion = self.completion
        )))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
