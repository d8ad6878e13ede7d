//! HTTP tool manifests and the provider that executes them.
//!
//! A manifest declared under the top-level `tools` section of a process
//! definition describes a remote service: a base URL, optional bearer
//! auth (the secret names an environment variable), and a set of
//! operations. `utcp_agent` nodes expose each operation to the model as a
//! callable tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Tool, ToolDefinition};
use crate::error::AgentError;

/// A declared remote tool service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub description: String,
    /// Only `http` is supported.
    pub provider_type: String,
    pub provider_config: ProviderConfig,
    pub tools: Vec<RemoteOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Auth scheme; only `bearer` is supported.
    #[serde(rename = "type")]
    pub scheme: String,
    /// Name of the environment variable holding the token.
    pub secret: String,
}

/// One callable operation within a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOperation {
    pub name: String,
    pub description: String,
    /// Path appended to the manifest base URL.
    pub endpoint: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Executes a manifest operation against its remote service.
#[async_trait]
pub trait HttpToolProvider: Send + Sync {
    async fn invoke(
        &self,
        manifest: &ToolManifest,
        operation: &RemoteOperation,
        args: &Value,
    ) -> Result<Value, AgentError>;
}

/// Default provider backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestToolProvider {
    client: reqwest::Client,
}

impl ReqwestToolProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpToolProvider for ReqwestToolProvider {
    async fn invoke(
        &self,
        manifest: &ToolManifest,
        operation: &RemoteOperation,
        args: &Value,
    ) -> Result<Value, AgentError> {
        let url = format!(
            "{}/{}",
            manifest.provider_config.base_url.trim_end_matches('/'),
            operation.endpoint.trim_start_matches('/')
        );
        let method = reqwest::Method::from_bytes(operation.method.to_uppercase().as_bytes())
            .map_err(|_| {
                AgentError::Http(format!(
                    "operation '{}' declares invalid method '{}'",
                    operation.name, operation.method
                ))
            })?;

        let mut request = self.client.request(method.clone(), url.as_str());

        if let Some(auth) = &manifest.provider_config.auth {
            if auth.scheme != "bearer" {
                return Err(AgentError::Http(format!(
                    "unsupported auth scheme '{}'",
                    auth.scheme
                )));
            }
            let token = std::env::var(&auth.secret).map_err(|_| {
                AgentError::Http(format!(
                    "auth secret environment variable '{}' is not set",
                    auth.secret
                ))
            })?;
            request = request.bearer_auth(token);
        }

        request = if method == reqwest::Method::GET {
            request.query(&flatten_query(args))
        } else {
            request.json(args)
        };

        tracing::debug!(url = %url, operation = %operation.name, "invoking remote tool");

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::Http(format!("request to '{url}' failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Http(format!(
                "'{url}' returned status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Http(format!("reading response from '{url}': {e}")))?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

fn flatten_query(args: &Value) -> Vec<(String, String)> {
    match args {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Adapter exposing one manifest operation as a `Tool`.
pub struct RemoteTool {
    manifest: Arc<ToolManifest>,
    operation: RemoteOperation,
    provider: Arc<dyn HttpToolProvider>,
}

impl RemoteTool {
    pub fn new(
        manifest: Arc<ToolManifest>,
        operation: RemoteOperation,
        provider: Arc<dyn HttpToolProvider>,
    ) -> Self {
        Self {
            manifest,
            operation,
            provider,
        }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.operation.name.clone(),
            description: self.operation.description.clone(),
            parameters: self.operation.parameters.clone(),
        }
    }

    async fn call(&self, args: Value) -> Result<Value, AgentError> {
        self.provider
            .invoke(&self.manifest, &self.operation, &args)
            .await
    }
}
