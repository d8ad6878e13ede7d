//! Remote-tool agent: the reason-act loop over HTTP tool manifests.

use std::sync::Arc;

use serde_json::json;

use super::prompt::PromptTemplate;
use super::tool_using::drive_tool_loop;
use crate::error::AgentError;
use crate::llm::ModelClient;
use crate::state::{AgentOutput, GlobalState, LogEntry};
use crate::tools::{DynTool, HttpToolProvider, RemoteTool, ToolManifest};

/// Like `tool_using`, but every tool is an operation of an HTTP manifest
/// declared at the top level of the process definition, invoked through
/// the engine's `HttpToolProvider`.
pub struct UtcpAgent {
    name: String,
    purpose: String,
    model_name: String,
    template: PromptTemplate,
    output_key: String,
    force_json_output: bool,
    tools: Vec<DynTool>,
    max_steps: usize,
    model: Arc<dyn ModelClient>,
}

impl UtcpAgent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: impl Into<String>,
        purpose: impl Into<String>,
        model_name: impl Into<String>,
        template: PromptTemplate,
        output_key: impl Into<String>,
        force_json_output: bool,
        manifests: Vec<Arc<ToolManifest>>,
        provider: Arc<dyn HttpToolProvider>,
        max_steps: usize,
        model: Arc<dyn ModelClient>,
    ) -> Self {
        let tools = manifests
            .iter()
            .flat_map(|manifest| {
                manifest.tools.iter().map(|operation| {
                    Arc::new(RemoteTool::new(
                        Arc::clone(manifest),
                        operation.clone(),
                        Arc::clone(&provider),
                    )) as DynTool
                })
            })
            .collect();

        Self {
            name: name.into(),
            purpose: purpose.into(),
            model_name: model_name.into(),
            template,
            output_key: output_key.into(),
            force_json_output,
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
            self.force_json_output,
        )
        .await?;

        Ok(AgentOutput::default()
            .with_artifact(&self.output_key, answer)
            .with_message(LogEntry::new(&self.name, "utcp_agent").with_detail(json!({
                "model": self.model_name,
                "purpose": self.purpose,
                "steps": steps,
            }))))
    }
}
