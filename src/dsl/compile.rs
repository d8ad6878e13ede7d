//! Compilation of a validated document into a runnable process.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::validate::non_blank;
use super::{AgentSpec, ProcessDoc};
use crate::agents::{
    AgentNode, DeterministicAgent, LlmAgent, PromptTemplate, ReflectionAgent, SupervisorAgent,
    ToolUsingAgent, UtcpAgent,
};
use crate::error::DslError;
use crate::expr::Condition;
use crate::llm::ModelClient;
use crate::tools::{HttpToolProvider, ToolManifest, ToolRegistry};

/// A compiled transition.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<Condition>,
}

/// A compiled, immutable process definition: agents are instantiated once
/// and reused across steps.
pub struct Process {
    pub name: String,
    pub start: String,
    pub done_condition: Option<Condition>,
    pub agents: BTreeMap<String, AgentNode>,
    pub edges: Vec<Edge>,
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("edges", &self.edges.len())
            .finish()
    }
}

/// Instantiate every agent and compile every condition.
///
/// Assumes `validate` has passed; reference lookups still fail loudly
/// rather than panicking.
pub fn compile(
    doc: &ProcessDoc,
    model: Arc<dyn ModelClient>,
    registry: &ToolRegistry,
    http_provider: Arc<dyn HttpToolProvider>,
    tool_step_limit: usize,
) -> Result<Process, DslError> {
    let manifests: BTreeMap<String, Arc<ToolManifest>> = doc
        .tools
        .iter()
        .map(|(name, manifest)| (name.clone(), Arc::new(manifest.clone())))
        .collect();

    let mut agents = BTreeMap::new();
    for (name, spec) in &doc.agents {
        let node = match spec {
            AgentSpec::Llm {
                purpose,
                model_name,
                prompt_template,
                output_key,
                force_json_output,
            } => AgentNode::Llm(LlmAgent::new(
                name,
                purpose.as_deref().unwrap_or(name),
                model_name,
                PromptTemplate::new(prompt_template),
                output_key,
                *force_json_output,
                Arc::clone(&model),
            )),
            AgentSpec::Deterministic { purpose, function } => {
                let resolved =
                    registry
                        .function(function)
                        .ok_or_else(|| DslError::UnknownFunction {
                            agent: name.clone(),
                            function: function.clone(),
                        })?;
                AgentNode::Deterministic(DeterministicAgent::new(
                    name,
                    purpose.as_deref().unwrap_or(name),
                    function,
                    resolved,
                ))
            }
            AgentSpec::Reflection {
                purpose,
                model_name,
                prompt_template,
            } => AgentNode::Reflection(ReflectionAgent::new(
                name,
                purpose.as_deref().unwrap_or(name),
                model_name,
                PromptTemplate::new(prompt_template),
                Arc::clone(&model),
            )),
            AgentSpec::ToolUsing {
                purpose,
                model_name,
                tools,
                prompt_template,
                output_key,
            } => {
                let mut resolved = Vec::with_capacity(tools.len());
                for tool in tools {
                    resolved.push(registry.tool(tool).ok_or_else(|| DslError::UnknownTool {
                        agent: name.clone(),
                        tool: tool.clone(),
                    })?);
                }
                AgentNode::ToolUsing(ToolUsingAgent::new(
                    name,
                    purpose.as_deref().unwrap_or(name),
                    model_name,
                    PromptTemplate::new(prompt_template),
                    output_key,
                    resolved,
                    tool_step_limit,
                    Arc::clone(&model),
                ))
            }
            AgentSpec::Supervisor {
                purpose,
                model_name,
                available_agents,
                prompt_template,
            } => AgentNode::Supervisor(SupervisorAgent::new(
                name,
                purpose.as_deref().unwrap_or(name),
                model_name,
                PromptTemplate::new(prompt_template),
                available_agents.clone(),
                Arc::clone(&model),
            )),
            AgentSpec::UtcpAgent {
                purpose,
                model_name,
                tools,
                prompt_template,
                output_key,
                force_json_output,
            } => {
                let mut resolved = Vec::with_capacity(tools.len());
                for manifest in tools {
                    resolved.push(Arc::clone(manifests.get(manifest).ok_or_else(|| {
                        DslError::UnknownManifest {
                            agent: name.clone(),
                            manifest: manifest.clone(),
                        }
                    })?));
                }
                AgentNode::Utcp(UtcpAgent::new(
                    name,
                    purpose.as_deref().unwrap_or(name),
                    model_name,
                    PromptTemplate::new(prompt_template),
                    output_key,
                    *force_json_output,
                    resolved,
                    Arc::clone(&http_provider),
                    tool_step_limit,
                    Arc::clone(&model),
                ))
            }
        };
        agents.insert(name.clone(), node);
    }

    let mut edges = Vec::with_capacity(doc.edges.len());
    for (index, spec) in doc.edges.iter().enumerate() {
        let condition = match non_blank(spec.condition.as_deref()) {
            Some(source) => Some(
                Condition::parse(source)
                    .map_err(|source| DslError::InvalidEdgeCondition { index, source })?,
            ),
            None => None,
        };
        edges.push(Edge {
            from: spec.from.clone(),
            to: spec.to.clone(),
            condition,
        });
    }

    let done_condition = match non_blank(doc.process.done_condition.as_deref()) {
        Some(source) => {
            Some(Condition::parse(source).map_err(|source| DslError::InvalidDoneCondition {
                source,
            })?)
        }
        None => None,
    };

    Ok(Process {
        name: doc.process.name.clone(),
        start: doc.process.start.clone(),
        done_condition,
        agents,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::load_str;
    use crate::llm::SimulatedModelClient;
    use crate::tools::ReqwestToolProvider;

    #[test]
    fn compiles_every_kind() {
        let doc = load_str(
            r#"
process:
  name: all_kinds
  start: plan
  done_condition: "artifacts.final is not None"
agents:
  plan:
    kind: llm
    model_name: m1
    prompt_template: "Plan {context[topic]}"
    output_key: plan
    force_json_output: true
  consolidate:
    kind: deterministic
    function: merge
  review:
    kind: reflection
    model_name: m1
    prompt_template: "Review {artifacts[plan]}"
  research:
    kind: tool_using
    model_name: m1
    tools: [lookup]
    prompt_template: "Research"
    output_key: research
  boss:
    kind: supervisor
    model_name: m1
    available_agents: [plan, research]
    prompt_template: "Route"
  crm:
    kind: utcp_agent
    model_name: m1
    tools: [crm_api]
    prompt_template: "Fetch"
    output_key: account
tools:
  crm_api:
    description: CRM
    provider_type: http
    provider_config: {base_url: "https://crm.example.com"}
    tools:
      - {name: fetch, description: Fetch, endpoint: /fetch, method: GET, parameters: {}}
edges:
  - {from: plan, to: review}
  - {from: review, to: __end__, condition: "quality.review_status == 'APROVADO'"}
"#,
        )
        .unwrap();

        let mut registry = ToolRegistry::new();
        registry.register_function("merge", |_| Ok(crate::state::AgentOutput::default()));

        struct NullTool;

        #[async_trait::async_trait]
        impl crate::tools::Tool for NullTool {
            fn definition(&self) -> crate::tools::ToolDefinition {
                crate::tools::ToolDefinition {
                    name: "lookup".into(),
                    description: "Lookup".into(),
                    parameters: serde_json::json!({}),
                }
            }

            async fn call(
                &self,
                _args: serde_json::Value,
            ) -> Result<serde_json::Value, crate::error::AgentError> {
                Ok(serde_json::Value::Null)
            }
        }
        registry.register_tool(Arc::new(NullTool));

        let process = compile(
            &doc,
            Arc::new(SimulatedModelClient::default()),
            &registry,
            Arc::new(ReqwestToolProvider::new()),
            8,
        )
        .unwrap();

        assert_eq!(process.agents.len(), 6);
        assert_eq!(process.agents["plan"].kind(), "llm");
        assert_eq!(process.agents["boss"].kind(), "supervisor");
        assert_eq!(process.agents["crm"].kind(), "utcp_agent");
        assert!(process.done_condition.is_some());
        assert_eq!(process.edges.len(), 2);
        assert!(process.edges[0].condition.is_none());
        assert!(process.edges[1].condition.is_some());
    }
}
