//! Prompt template rendering against the process state.
//!
//! Placeholders take the forms `{context[key]}`, `{artifacts[key]}` and
//! `{quality[key]}`, with nested access by repeating bracketed keys
//! (`{context[briefing][product]}`). A bare root (`{context}`) renders the
//! whole section as JSON. Missing keys render as the empty string so
//! prompts stay robust against not-yet-produced artifacts; `{{` and `}}`
//! escape literal braces.

use serde_json::Value;

use crate::state::{GlobalState, Section};

/// A reusable prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template. Never fails: anything unresolvable becomes "".
    pub fn render(&self, state: &GlobalState) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut chars = self.source.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut placeholder = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        placeholder.push(inner);
                    }
                    if closed {
                        out.push_str(&resolve(&placeholder, state));
                    }
                    // An unterminated placeholder renders as nothing.
                }
                other => out.push(other),
            }
        }
        out
    }
}

fn resolve(placeholder: &str, state: &GlobalState) -> String {
    let (root, keys) = match parse_placeholder(placeholder) {
        Some(parts) => parts,
        None => return String::new(),
    };

    let section: &Section = match root {
        "context" => &state.context,
        "artifacts" => &state.artifacts,
        "quality" => &state.quality,
        _ => return String::new(),
    };

    if keys.is_empty() {
        return Value::Object(section.clone()).to_string();
    }

    let mut current = Value::Object(section.clone());
    for key in keys {
        current = match &current {
            Value::Object(map) => match map.get(&key) {
                Some(value) => value.clone(),
                None => return String::new(),
            },
            Value::Array(items) => match key.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(value) => value.clone(),
                None => return String::new(),
            },
            _ => return String::new(),
        };
    }

    render_value(&current)
}

fn parse_placeholder(placeholder: &str) -> Option<(&str, Vec<String>)> {
    let trimmed = placeholder.trim();
    let root_end = trimmed.find('[').unwrap_or(trimmed.len());
    let root = &trimmed[..root_end];
    if root.is_empty() {
        return None;
    }

    let mut keys = Vec::new();
    let mut rest = &trimmed[root_end..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return None;
        }
        let close = rest.find(']')?;
        let key = rest[1..close].trim().trim_matches(|c| c == '\'' || c == '"');
        keys.push(key.to_string());
        rest = &rest[close + 1..];
    }
    Some((root, keys))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
