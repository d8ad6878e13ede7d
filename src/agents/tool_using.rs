//! Reason-act tool agent and the bounded loop it drives.

use std::sync::Arc;

use serde_json::{json, Value};

use super::prompt::PromptTemplate;
use crate::error::AgentError;
use crate::llm::{CompletionOptions, ModelClient, ModelReply};
use crate::state::{AgentOutput, GlobalState, LogEntry};
use crate::tools::DynTool;

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const ACTION_MARKER: &str = "Action:";
const ACTION_INPUT_MARKER: &str = "Action Input:";

/// Drives a reason-act-observe loop over a fixed tool set until the model
/// emits a final answer or the step cap is reached. The final answer lands
/// at `artifacts[output_key]`.
pub struct ToolUsingAgent {
    name: String,
    purpose: String,
    model_name: String,
    template: PromptTemplate,
    output_key: String,
    tools: Vec<DynTool>,
    max_steps: usize,
    model: Arc<dyn ModelClient>,
}

impl ToolUsingAgent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        model_name: impl Into<String>,
        template: PromptTemplate,
        output_key: impl Into<String>,
        tools: Vec<DynTool>,
        max_steps: usize,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            model_name: model_name.into(),
            template,
            output_key: output_key.into(),
            tools,
            max_steps,
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn execute(&self, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        let prompt = self.template.render(state);
        let (answer, steps) = drive_tool_loop(
            &self.name,
            self.model.as_ref(),
            &self.model_name,
            &prompt,
            &self.tools,
            self.max_steps,
            false,
        )
        .await?;

        Ok(AgentOutput::default()
            .with_artifact(&self.output_key, answer)
            .with_message(LogEntry::new(&self.name, "tool_using").with_detail(json!({
                "model": self.model_name,
                "purpose": self.purpose,
                "steps": steps,
            }))))
    }
}

/// Shared reason-act loop. Returns the final answer and how many model
/// calls it took. Tool failures become observations rather than faults so
/// the model can recover; only model failures and cap exhaustion abort.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn drive_tool_loop(
    agent_name: &str,
    model: &dyn ModelClient,
    model_name: &str,
    base_prompt: &str,
    tools: &[DynTool],
    max_steps: usize,
    json_mode: bool,
) -> Result<(Value, usize), AgentError> {
    let mut transcript = String::new();

    for step in 1..=max_steps {
        let prompt = compose_prompt(base_prompt, tools, &transcript);
        let reply = model
            .complete(model_name, &prompt, &CompletionOptions::default())
            .await
            .map_err(|e| {
                AgentError::Llm(format!(
                    "LLM invocation failed for model '{model_name}': {e}"
                ))
            })?;

        let text = match reply {
            ModelReply::Structured(value) => return Ok((value, step)),
            ModelReply::Text(text) => text,
        };

        if let Some(answer) = extract_final_answer(&text) {
            let value = if json_mode {
                serde_json::from_str(&answer).map_err(|e| {
                    AgentError::Llm(format!(
                        "model '{model_name}' did not return valid JSON: {e}"
                    ))
                })?
            } else {
                Value::String(answer)
            };
            return Ok((value, step));
        }

        match extract_action(&text) {
            Some((action, input)) => {
                let observation = match tools
                    .iter()
                    .find(|tool| tool.definition().name == action)
                {
                    Some(tool) => match tool.call(input).await {
                        Ok(result) => match result {
                            Value::String(s) => s,
                            other => other.to_string(),
                        },
                        Err(e) => format!("Tool error: {e}"),
                    },
                    None => format!("Unknown tool: {action}"),
                };
                tracing::debug!(agent = agent_name, action = %action, "tool step");
                transcript.push_str(&format!(
                    "Action: {action}\nObservation: {observation}\n"
                ));
            }
            // No action and no final marker: take the reply as the answer.
            None => return Ok((Value::String(text), step)),
        }
    }

    Err(AgentError::Tool(format!(
        "tool loop for '{agent_name}' exceeded {max_steps} steps without a final answer"
    )))
}

fn compose_prompt(base: &str, tools: &[DynTool], transcript: &str) -> String {
    let mut prompt = String::from(base);
    prompt.push_str("\n\nYou can use the following tools:\n");
    for tool in tools {
        let definition = tool.definition();
        prompt.push_str(&format!("- {}: {}\n", definition.name, definition.description));
    }
    prompt.push_str(
        "\nTo call a tool, reply with:\nAction: <tool name>\nAction Input: <JSON arguments>\n\
         \nWhen you are done, reply with:\nFinal Answer: <your answer>\n",
    );
    if !transcript.is_empty() {
        prompt.push_str("\nPrevious steps:\n");
        prompt.push_str(transcript);
    }
    prompt
}

fn extract_final_answer(text: &str) -> Option<String> {
    text.find(FINAL_ANSWER_MARKER)
        .map(|idx| text[idx + FINAL_ANSWER_MARKER.len()..].trim().to_string())
}

fn extract_action(text: &str) -> Option<(String, Value)> {
    let action = text
        .lines()
        .find_map(|line| line.trim().strip_prefix(ACTION_MARKER))
        .map(str::trim)?;

    let input = text
        .lines()
        .find_map(|line| line.trim().strip_prefix(ACTION_INPUT_MARKER))
        .map(str::trim)
        .map(|raw| serde_json::from_str(raw).unwrap_or(Value::String(raw.to_string())))
        .unwrap_or(json!({}));

    Some((action.to_string(), input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::llm::ModelError;
    use crate::tools::{Tool, ToolDefinition};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedClient {
        replies: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn complete(
            &self,
            _model: &str,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<ModelReply, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(ModelError::new("script exhausted"));
            }
            Ok(ModelReply::Text(replies.remove(0)))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "lookup".into(),
                description: "Look something up.".into(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn call(&self, args: Value) -> Result<Value, AgentError> {
            let query = args.get("query").and_then(Value::as_str).unwrap_or("?");
            Ok(Value::String(format!("result for {query}")))
        }
    }

    fn agent(client: Arc<ScriptedClient>, max_steps: usize) -> ToolUsingAgent {
        ToolUsingAgent::new(
            "researcher",
            "Gather background",
            "test-model",
            PromptTemplate::new("Research {context[topic]}"),
            "research",
            vec![Arc::new(LookupTool) as DynTool],
            max_steps,
            client,
        )
    }

    #[tokio::test]
    async fn immediate_final_answer_skips_tools() {
        let client = Arc::new(ScriptedClient::new(vec!["Final Answer: Research result"]));
        let out = agent(client.clone(), 8)
            .execute(&GlobalState::default())
            .await
            .unwrap();

        assert_eq!(
            out.artifacts.unwrap().get("research"),
            Some(&json!("Research result"))
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tool_call_feeds_observation_into_next_step() {
        let client = Arc::new(ScriptedClient::new(vec![
            "Action: lookup\nAction Input: {\"query\": \"rust\"}",
            "Final Answer: done",
        ]));
        let out = agent(client.clone(), 8)
            .execute(&GlobalState::default())
            .await
            .unwrap();

        assert_eq!(out.artifacts.unwrap().get("research"), Some(&json!("done")));
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        let detail = out.messages[0].detail.as_ref().unwrap();
        assert_eq!(detail["steps"], json!(2));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_an_observation() {
        let client = Arc::new(ScriptedClient::new(vec![
            "Action: nonexistent\nAction Input: {}",
            "Final Answer: recovered",
        ]));
        let out = agent(client, 8).execute(&GlobalState::default()).await.unwrap();
        assert_eq!(
            out.artifacts.unwrap().get("research"),
            Some(&json!("recovered"))
        );
    }

    #[tokio::test]
    async fn step_cap_exhaustion_is_a_tool_error() {
        let client = Arc::new(ScriptedClient::new(vec![
            "Action: lookup\nAction Input: {}",
            "Action: lookup\nAction Input: {}",
            "Action: lookup\nAction Input: {}",
        ]));
        let err = agent(client, 3)
            .execute(&GlobalState::default())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("tool: "));
        assert!(err.to_string().contains("exceeded 3 steps"));
    }

    #[tokio::test]
    async fn plain_reply_without_markers_is_the_answer() {
        let client = Arc::new(ScriptedClient::new(vec!["just an answer"]));
        let out = agent(client, 8).execute(&GlobalState::default()).await.unwrap();
        assert_eq!(
            out.artifacts.unwrap().get("research"),
            Some(&json!("just an answer"))
        );
    }

    #[test]
    fn action_extraction_parses_json_arguments() {
        let (action, input) =
            extract_action("Thought: hmm\nAction: lookup\nAction Input: {\"query\": \"x\"}")
                .unwrap();
        assert_eq!(action, "lookup");
        assert_eq!(input, json!({"query": "x"}));
    }

    #[test]
    fn final_answer_extraction_trims_whitespace() {
        assert_eq!(
            extract_final_answer("Thought: done\nFinal Answer:   42  "),
            Some("42".to_string())
        );
        assert_eq!(extract_final_answer("no marker"), None);
    }
}
