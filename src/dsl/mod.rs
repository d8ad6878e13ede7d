//! YAML surface of a process definition and its loader.
//!
//! Loading is strict and happens in two phases: a shape pass over the raw
//! document that produces located errors (which top-level section, which
//! agent, which field), then typed deserialization of each part. Reference
//! validation and agent instantiation live in `validate` and `compile`.

mod compile;
mod validate;

pub use compile::{compile, Edge, Process};
pub use validate::validate;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DslError;
use crate::tools::ToolManifest;

/// Reserved terminal node name: an edge to `__end__` terminates the run.
pub const END_NODE: &str = "__end__";

/// A parsed process definition, prior to validation and compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDoc {
    pub process: ProcessSpec,
    pub agents: BTreeMap<String, AgentSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, ToolManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// One agent block, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentSpec {
    Llm {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        model_name: String,
        prompt_template: String,
        output_key: String,
        #[serde(default)]
        force_json_output: bool,
    },
    Deterministic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        function: String,
    },
    Reflection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        model_name: String,
        prompt_template: String,
    },
    ToolUsing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        model_name: String,
        tools: Vec<String>,
        prompt_template: String,
        output_key: String,
    },
    Supervisor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        model_name: String,
        available_agents: Vec<String>,
        prompt_template: String,
    },
    UtcpAgent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        model_name: String,
        tools: Vec<String>,
        prompt_template: String,
        output_key: String,
        #[serde(default)]
        force_json_output: bool,
    },
}

impl AgentSpec {
    pub fn is_supervisor(&self) -> bool {
        matches!(self, AgentSpec::Supervisor { .. })
    }
}

/// Parse a YAML document into a `ProcessDoc`.
pub fn load_str(input: &str) -> Result<ProcessDoc, DslError> {
    let raw: serde_yaml::Value = serde_yaml::from_str(input)?;
    let mapping = raw
        .as_mapping()
        .ok_or(DslError::MissingSection("process"))?;

    let process_raw = mapping
        .get(&key("process"))
        .ok_or(DslError::MissingSection("process"))?;
    let agents_raw = mapping
        .get(&key("agents"))
        .ok_or(DslError::MissingSection("agents"))?;

    let process_mapping = process_raw
        .as_mapping()
        .ok_or(DslError::InvalidSection("process"))?;
    for field in ["name", "start"] {
        if !process_mapping.contains_key(&key(field)) {
            return Err(DslError::MissingProcessField(field));
        }
    }
    let process: ProcessSpec = serde_yaml::from_value(process_raw.clone())?;

    let agent_entries = agents_raw
        .as_mapping()
        .ok_or(DslError::InvalidSection("agents"))?;
    if agent_entries.is_empty() {
        return Err(DslError::InvalidSection("agents"));
    }

    let mut agents = BTreeMap::new();
    for (name_raw, spec_raw) in agent_entries {
        let name = name_raw
            .as_str()
            .ok_or(DslError::InvalidSection("agents"))?
            .to_string();
        let spec: AgentSpec =
            serde_yaml::from_value(spec_raw.clone()).map_err(|e| DslError::AgentSpec {
                agent: name.clone(),
                message: e.to_string(),
            })?;
        agents.insert(name, spec);
    }

    let edges: Vec<EdgeSpec> = match mapping.get(&key("edges")) {
        Some(edges_raw) => serde_yaml::from_value(edges_raw.clone())?,
        None => Vec::new(),
    };

    let tools: BTreeMap<String, ToolManifest> = match mapping.get(&key("tools")) {
        Some(tools_raw) => serde_yaml::from_value(tools_raw.clone())?,
        None => BTreeMap::new(),
    };

    Ok(ProcessDoc {
        process,
        agents,
        edges,
        tools,
    })
}

/// Read and parse a process definition from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<ProcessDoc, DslError> {
    let input = std::fs::read_to_string(path)?;
    load_str(&input)
}

fn key(name: &str) -> serde_yaml::Value {
    serde_yaml::Value::String(name.to_string())
}
