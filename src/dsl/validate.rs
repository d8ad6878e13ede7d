//! Structural and reference validation of a parsed process definition.
//!
//! All checks run before any agent is instantiated; the first violation
//! aborts with a `DslError` naming the offending field.

use super::{AgentSpec, ProcessDoc, END_NODE};
use crate::error::DslError;
use crate::expr::Condition;
use crate::tools::ToolRegistry;

pub fn validate(doc: &ProcessDoc, registry: &ToolRegistry) -> Result<(), DslError> {
    // A graph without edges is only meaningful when a supervisor routes.
    if doc.edges.is_empty() && !doc.agents.values().any(AgentSpec::is_supervisor) {
        return Err(DslError::MissingEdges);
    }

    if !doc.agents.contains_key(&doc.process.start) {
        return Err(DslError::UnknownStart(doc.process.start.clone()));
    }

    for (index, edge) in doc.edges.iter().enumerate() {
        if !doc.agents.contains_key(&edge.from) {
            return Err(DslError::UnknownEdgeSource {
                index,
                name: edge.from.clone(),
            });
        }
        if edge.to != END_NODE && !doc.agents.contains_key(&edge.to) {
            return Err(DslError::UnknownEdgeTarget {
                index,
                name: edge.to.clone(),
            });
        }
    }

    for (name, spec) in &doc.agents {
        match spec {
            AgentSpec::Deterministic { function, .. } => {
                if !registry.has_function(function) {
                    return Err(DslError::UnknownFunction {
                        agent: name.clone(),
                        function: function.clone(),
                    });
                }
            }
            AgentSpec::ToolUsing { tools, .. } => {
                for tool in tools {
                    if !registry.has_tool(tool) {
                        return Err(DslError::UnknownTool {
                            agent: name.clone(),
                            tool: tool.clone(),
                        });
                    }
                }
            }
            AgentSpec::UtcpAgent { tools, .. } => {
                for manifest in tools {
                    if !doc.tools.contains_key(manifest) {
                        return Err(DslError::UnknownManifest {
                            agent: name.clone(),
                            manifest: manifest.clone(),
                        });
                    }
                }
            }
            AgentSpec::Supervisor {
                available_agents, ..
            } => {
                for target in available_agents {
                    if !doc.agents.contains_key(target) {
                        return Err(DslError::UnknownSupervisorTarget {
                            agent: name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
            AgentSpec::Llm { .. } | AgentSpec::Reflection { .. } => {}
        }
    }

    for (index, edge) in doc.edges.iter().enumerate() {
        if let Some(condition) = non_blank(edge.condition.as_deref()) {
            Condition::parse(condition)
                .map_err(|source| DslError::InvalidEdgeCondition { index, source })?;
        }
    }

    if let Some(condition) = non_blank(doc.process.done_condition.as_deref()) {
        Condition::parse(condition).map_err(|source| DslError::InvalidDoneCondition { source })?;
    }

    Ok(())
}

/// A blank condition string is treated as "no condition".
pub(crate) fn non_blank(condition: Option<&str>) -> Option<&str> {
    condition.map(str::trim).filter(|s| !s.is_empty())
}
