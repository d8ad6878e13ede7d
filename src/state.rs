//! Global process state and the delta algebra applied at every step.
//!
//! `GlobalState` is never mutated in place: each step produces a new value
//! by deep-merging an `AgentOutput` delta into the previous snapshot.
//! `messages` is the one append-only section.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One semantic container of the state: string keys to structured values.
pub type Section = serde_json::Map<String, Value>;

/// An audit event recorded in the `messages` log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Node that produced the event.
    pub agent: String,
    /// Event kind, e.g. `step`, `done`, `cancelled`, `loop-guard`.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl LogEntry {
    pub fn new(agent: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            kind: kind.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Immutable four-section state carried through a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Inputs and invariants supplied by the caller.
    #[serde(default)]
    pub context: Section,
    /// Named outputs produced by agents.
    #[serde(default)]
    pub artifacts: Section,
    /// Control signals used for routing.
    #[serde(default)]
    pub quality: Section,
    /// Append-only ordered audit log.
    #[serde(default)]
    pub messages: Vec<LogEntry>,
}

impl GlobalState {
    /// Entry state for a run: the given context, everything else empty.
    pub fn with_context(context: Section) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Produce the next snapshot by merging a delta into this one.
    ///
    /// `context`, `artifacts` and `quality` deep-merge; `messages` appends.
    /// Applying an empty delta yields a structurally equal state.
    pub fn apply(&self, delta: &AgentOutput) -> GlobalState {
        let mut messages = self.messages.clone();
        messages.extend(delta.messages.iter().cloned());

        GlobalState {
            context: merge_section(&self.context, delta.context.as_ref()),
            artifacts: merge_section(&self.artifacts, delta.artifacts.as_ref()),
            quality: merge_section(&self.quality, delta.quality.as_ref()),
            messages,
        }
    }
}

fn merge_section(prior: &Section, delta: Option<&Section>) -> Section {
    match delta {
        Some(delta) => deep_merge(prior, delta),
        None => prior.clone(),
    }
}

/// Partial state returned by an agent. A missing section is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<LogEntry>,
}

impl AgentOutput {
    pub fn is_empty(&self) -> bool {
        self.context.is_none()
            && self.artifacts.is_none()
            && self.quality.is_none()
            && self.messages.is_empty()
    }

    pub fn with_context_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context
            .get_or_insert_with(Section::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_artifact(mut self, key: impl Into<String>, value: Value) -> Self {
        self.artifacts
            .get_or_insert_with(Section::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_quality(mut self, key: impl Into<String>, value: Value) -> Self {
        self.quality
            .get_or_insert_with(Section::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_message(mut self, entry: LogEntry) -> Self {
        self.messages.push(entry);
        self
    }
}

/// Recursive mapping merge with right-side precedence.
///
/// Mappings recurse per key; sequences and scalars from `delta` replace the
/// prior value wholesale. Pure: both inputs remain usable.
pub fn deep_merge(prior: &Section, delta: &Section) -> Section {
    let mut out = prior.clone();
    for (key, incoming) in delta {
        let merged = match (out.get(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(next)) => {
                Value::Object(deep_merge(existing, next))
            }
            _ => incoming.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(value: Value) -> Section {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn apply_empty_delta_is_identity() {
        let state = GlobalState::with_context(section(json!({
            "briefing": {"product": "Example"},
        })));
        let next = state.apply(&AgentOutput::default());
        assert_eq!(state, next);
    }

    #[test]
    fn deep_merge_recurses_into_mappings() {
        let prior = section(json!({"a": {"x": 1, "y": 2}, "b": "keep"}));
        let delta = section(json!({"a": {"y": 3, "z": 4}}));

        let merged = deep_merge(&prior, &delta);

        assert_eq!(Value::Object(merged), json!({
            "a": {"x": 1, "y": 3, "z": 4},
            "b": "keep",
        }));
    }

    #[test]
    fn deep_merge_replaces_sequences_wholesale() {
        let prior = section(json!({"items": [1, 2, 3]}));
        let delta = section(json!({"items": [9]}));

        let merged = deep_merge(&prior, &delta);

        assert_eq!(merged.get("items"), Some(&json!([9])));
    }

    #[test]
    fn deep_merge_overwrites_mismatched_types() {
        let prior = section(json!({"value": {"nested": true}}));
        let delta = section(json!({"value": "flat"}));

        let merged = deep_merge(&prior, &delta);

        assert_eq!(merged.get("value"), Some(&json!("flat")));
    }

    #[test]
    fn deep_merge_leaves_inputs_usable() {
        let prior = section(json!({"a": 1}));
        let delta = section(json!({"a": 2}));

        let _ = deep_merge(&prior, &delta);

        assert_eq!(prior.get("a"), Some(&json!(1)));
        assert_eq!(delta.get("a"), Some(&json!(2)));
    }

    #[test]
    fn messages_append_in_order() {
        let state = GlobalState::default();
        let first = state.apply(
            &AgentOutput::default().with_message(LogEntry::new("a", "step")),
        );
        let second = first.apply(
            &AgentOutput::default().with_message(LogEntry::new("b", "step")),
        );

        let agents: Vec<_> = second.messages.iter().map(|m| m.agent.as_str()).collect();
        assert_eq!(agents, vec!["a", "b"]);
    }

    #[test]
    fn sequential_apply_equals_merged_delta_except_messages() {
        let state = GlobalState::default();
        let d1 = AgentOutput::default()
            .with_artifact("copy", json!({"draft": 1}))
            .with_quality("attempts", json!(1));
        let d2 = AgentOutput::default()
            .with_artifact("copy", json!({"draft": 2, "tone": "warm"}))
            .with_quality("review_status", json!("REFINAR"));

        let stepped = state.apply(&d1).apply(&d2);

        let merged = AgentOutput {
            context: None,
            artifacts: Some(deep_merge(
                d1.artifacts.as_ref().unwrap(),
                d2.artifacts.as_ref().unwrap(),
            )),
            quality: Some(deep_merge(
                d1.quality.as_ref().unwrap(),
                d2.quality.as_ref().unwrap(),
            )),
            messages: vec![],
        };
        let combined = state.apply(&merged);

        assert_eq!(stepped.artifacts, combined.artifacts);
        assert_eq!(stepped.quality, combined.quality);
    }

    #[test]
    fn builder_helpers_populate_sections() {
        let delta = AgentOutput::default()
            .with_context_value("topic", json!("ai"))
            .with_artifact("draft", json!("text"))
            .with_quality("score", json!(0.9))
            .with_message(LogEntry::new("writer", "llm").with_detail(json!({"model": "m"})));

        assert!(!delta.is_empty());
        assert_eq!(delta.context.unwrap().get("topic"), Some(&json!("ai")));
        assert_eq!(delta.artifacts.unwrap().get("draft"), Some(&json!("text")));
        assert_eq!(delta.quality.unwrap().get("score"), Some(&json!(0.9)));
        assert_eq!(delta.messages[0].kind, "llm");
    }

    #[test]
    fn state_serializes_round_trip() {
        let state = GlobalState {
            context: section(json!({"skip": true})),
            artifacts: section(json!({"copy": "text"})),
            quality: section(json!({"attempts": 2})),
            messages: vec![LogEntry::new("review", "step")],
        };

        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: GlobalState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(state, decoded);
    }
}
