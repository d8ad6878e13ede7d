//! Run a process definition end-to-end with the offline simulated model
//! client and print the resulting artifacts, quality metrics and audit
//! log.
//!
//! ```text
//! pipeline_demo demos/copy_pipeline.yaml
//! pipeline_demo demos/copy_pipeline.yaml --context '{"briefing": {"product": "X"}}'
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};

use agentloom::{AgentOutput, Engine, GlobalState, Section, SimulatedModelClient, ToolRegistry};

#[derive(Parser)]
#[command(about = "Run a process definition with the simulated model client")]
struct Args {
    /// Path to the YAML process definition.
    config: PathBuf,

    /// Initial context as inline JSON (defaults to a sample briefing).
    #[arg(long)]
    context: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut registry = ToolRegistry::new();
    registry.register_function("consolidate_briefing", consolidate_briefing);

    let engine = Engine::builder(Arc::new(SimulatedModelClient::default()))
        .with_tool_registry(Arc::new(registry))
        .build_from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let context = match &args.context {
        Some(raw) => parse_context(raw)?,
        None => sample_context(),
    };

    let final_state = engine.run(context).await;
    report(&final_state);
    Ok(())
}

/// Deterministic sample function: folds the briefing and any extracted
/// pain points into a consolidated brief for downstream prompts.
fn consolidate_briefing(
    state: &GlobalState,
) -> Result<AgentOutput, agentloom::AgentError> {
    let briefing = state.context.get("briefing").cloned().unwrap_or(json!({}));
    let has_pain_points = state.artifacts.contains_key("pain_points");
    Ok(AgentOutput::default()
        .with_context_value(
            "consolidated_brief",
            json!({
                "briefing": briefing,
                "pain_points_available": has_pain_points,
            }),
        )
        .with_message(agentloom::LogEntry::new(
            "consolidate",
            "note",
        )))
}

fn parse_context(raw: &str) -> Result<Section> {
    let value: Value = serde_json::from_str(raw).context("parsing --context JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--context must be a JSON object"),
    }
}

fn sample_context() -> Section {
    let value = json!({
        "briefing": {
            "product": {
                "name": "Example Product",
                "audience": "Marketing professionals",
                "promise": "Raise conversions with persuasive messaging",
            },
            "value_proposition": "A practical copywriting framework with examples",
            "constraints": ["plain language", "avoid jargon"],
        },
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn report(state: &GlobalState) {
    println!("\n--- FINAL ARTIFACTS ---");
    for (key, value) in &state.artifacts {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let preview: String = rendered.chars().take(200).collect();
        println!("* {key}: {preview}...");
    }

    println!("\n--- QUALITY METRICS ---");
    for (key, value) in &state.quality {
        println!("* {key}: {value}");
    }

    println!("\n--- AUDIT LOG (last 10) ---");
    let start = state.messages.len().saturating_sub(10);
    for entry in &state.messages[start..] {
        match &entry.detail {
            Some(detail) => println!("- [{}] {} {}", entry.kind, entry.agent, detail),
            None => println!("- [{}] {}", entry.kind, entry.agent),
        }
    }
}
