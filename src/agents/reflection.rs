//! Self-review agent.

use std::sync::Arc;

use serde_json::{json, Value};

use super::prompt::PromptTemplate;
use crate::error::AgentError;
use crate::llm::{CompletionOptions, ModelClient};
use crate::state::{AgentOutput, GlobalState, LogEntry};

pub const APPROVED: &str = "APROVADO";
pub const REFINE: &str = "REFINAR";

/// Asks the model to review prior work and classifies the verdict.
///
/// Writes `quality.review_status` (one of the two labels),
/// `quality.feedback` (the raw reply) and increments `quality.attempts`.
pub struct ReflectionAgent {
    name: String,
    purpose: String,
    model_name: String,
    template: PromptTemplate,
    model: Arc<dyn ModelClient>,
}

impl ReflectionAgent {
    pub(crate) fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        model_name: impl Into<String>,
        template: PromptTemplate,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            model_name: model_name.into(),
            template,
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn execute(&self, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        let prompt = self.template.render(state);
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

        let feedback = reply.into_text();
        let status = classify(&feedback);
        let attempts = state
            .quality
            .get("attempts")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;

        tracing::debug!(agent = %self.name, status, attempts, "review classified");

        Ok(AgentOutput::default()
            .with_quality("review_status", json!(status))
            .with_quality("feedback", json!(feedback))
            .with_quality("attempts", json!(attempts))
            .with_message(LogEntry::new(&self.name, "reflection").with_detail(json!({
                "model": self.model_name,
                "purpose": self.purpose,
                "status": status,
            }))))
    }
}

/// `REFINAR` wins over `APROVADO` so a reply like `REPROVADO` never reads
/// as approval; anything unrecognized keeps refining.
fn classify(reply: &str) -> &'static str {
    let upper = reply.to_uppercase();
    if upper.contains(REFINE) {
        REFINE
    } else if upper.contains(APPROVED) {
        APPROVED
    } else {
        REFINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::llm::{ModelError, ModelReply};

    struct CannedReview(&'static str);

    #[async_trait]
    impl ModelClient for CannedReview {
        async fn complete(
            &self,
            _model: &str,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<ModelReply, ModelError> {
            Ok(ModelReply::Text(self.0.to_string()))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn agent(reply: &'static str) -> ReflectionAgent {
        ReflectionAgent::new(
            "review",
            "Critique the copy",
            "test-model",
            PromptTemplate::new("Review: {artifacts[main_copy]}"),
            Arc::new(CannedReview(reply)),
        )
    }

    #[tokio::test]
    async fn approval_writes_status_and_increments_attempts() {
        let out = agent("APROVADO").execute(&GlobalState::default()).await.unwrap();
        let quality = out.quality.unwrap();
        assert_eq!(quality.get("review_status"), Some(&json!("APROVADO")));
        assert_eq!(quality.get("attempts"), Some(&json!(1)));
        assert_eq!(quality.get("feedback"), Some(&json!("APROVADO")));
    }

    #[tokio::test]
    async fn attempts_accumulate_across_reviews() {
        let mut state = GlobalState::default();
        state.quality.insert("attempts".into(), json!(2));

        let out = agent("REFINAR: weak hook").execute(&state).await.unwrap();
        let quality = out.quality.unwrap();
        assert_eq!(quality.get("attempts"), Some(&json!(3)));
        assert_eq!(quality.get("review_status"), Some(&json!("REFINAR")));
    }

    #[test]
    fn classification_rules() {
        assert_eq!(classify("APROVADO"), APPROVED);
        assert_eq!(classify("aprovado, com ressalvas"), APPROVED);
        assert_eq!(classify("REFINAR o segundo parágrafo"), REFINE);
        assert_eq!(classify("REPROVADO"), REFINE);
        assert_eq!(classify("no verdict"), REFINE);
    }
}
