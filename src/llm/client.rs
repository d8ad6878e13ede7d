//! Model client trait definition.
//!
//! The engine is provider-agnostic: agents talk to a `ModelClient` and the
//! caller supplies the concrete wiring (an SDK bridge, a scripted test
//! double, or the offline simulated client).

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Options forwarded to the provider on each call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Ask the provider for structured (JSON) output.
    pub json_mode: bool,
}

/// A completion reply: plain text, or data already parsed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    Structured(Value),
}

impl ModelReply {
    /// Flatten to text: structured replies render as compact JSON.
    pub fn into_text(self) -> String {
        match self {
            ModelReply::Text(text) => text,
            ModelReply::Structured(value) => value.to_string(),
        }
    }

    /// Flatten to a JSON value: text becomes a string value.
    pub fn into_value(self) -> Value {
        match self {
            ModelReply::Text(text) => Value::String(text),
            ModelReply::Structured(value) => value,
        }
    }
}

/// Failure reported by a model provider.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct ModelError(pub String);

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Provider-agnostic completion seam.
///
/// One call per agent step; the engine never invokes a client concurrently.
/// Implementations own their own retry, timeout and thread-safety policy.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete a rendered prompt with the named model.
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ModelReply, ModelError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoClient;

    #[async_trait]
    impl ModelClient for EchoClient {
        async fn complete(
            &self,
            model: &str,
            prompt: &str,
            options: &CompletionOptions,
        ) -> Result<ModelReply, ModelError> {
            if options.json_mode {
                Ok(ModelReply::Structured(json!({"model": model})))
            } else {
                Ok(ModelReply::Text(format!("{model}: {prompt}")))
            }
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn echo_client_round_trips_prompt() {
        let client = EchoClient;
        let reply = client
            .complete("m1", "hello", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.into_text(), "m1: hello");
    }

    #[tokio::test]
    async fn json_mode_returns_structured_reply() {
        let client = EchoClient;
        let reply = client
            .complete("m1", "hello", &CompletionOptions { json_mode: true })
            .await
            .unwrap();
        assert_eq!(reply.into_value(), json!({"model": "m1"}));
    }

    #[test]
    fn reply_conversions() {
        assert_eq!(
            ModelReply::Text("plain".into()).into_value(),
            Value::String("plain".into())
        );
        assert_eq!(
            ModelReply::Structured(json!([1, 2])).into_text(),
            "[1,2]"
        );
    }
}
