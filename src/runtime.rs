//! Process runtime: drives a compiled graph to termination.
//!
//! Execution is strictly serial: one agent active at a time, state
//! transitions totally ordered, edges tried in declaration order at every
//! routing step. Validation is strict but the runtime is forgiving — the
//! only conditions that end a run are the done condition, a terminal edge,
//! the loop guard, cancellation, and the absence of a matching edge.
//! Agent faults are captured into `quality.error` and never raised.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::FINISH;
use crate::dsl::{self, Edge, Process, ProcessDoc, END_NODE};
use crate::error::DslError;
use crate::llm::ModelClient;
use crate::state::{AgentOutput, GlobalState, LogEntry, Section};
use crate::tools::{HttpToolProvider, ReqwestToolProvider, ToolRegistry};

/// Default per-node visit cap.
pub const DEFAULT_VISIT_LIMIT: usize = 50;

/// Default step cap for reason-act tool loops.
pub const DEFAULT_TOOL_STEP_LIMIT: usize = 8;

/// Cooperative cancellation flag, checked at the top of each step.
///
/// Cancelling never interrupts an in-flight agent; the run terminates
/// cleanly at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builder wiring the collaborator seams into an engine.
pub struct EngineBuilder {
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    http_provider: Arc<dyn HttpToolProvider>,
    visit_limit: usize,
    tool_step_limit: usize,
}

impl EngineBuilder {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            registry: Arc::new(ToolRegistry::new()),
            http_provider: Arc::new(ReqwestToolProvider::new()),
            visit_limit: DEFAULT_VISIT_LIMIT,
            tool_step_limit: DEFAULT_TOOL_STEP_LIMIT,
        }
    }

    pub fn with_tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_http_provider(mut self, provider: Arc<dyn HttpToolProvider>) -> Self {
        self.http_provider = provider;
        self
    }

    /// Override the per-node visit cap.
    pub fn with_visit_limit(mut self, limit: usize) -> Self {
        self.visit_limit = limit;
        self
    }

    /// Override the reason-act step cap.
    pub fn with_tool_step_limit(mut self, limit: usize) -> Self {
        self.tool_step_limit = limit;
        self
    }

    /// Load, validate and compile a process definition.
    pub fn build_from_str(self, input: &str) -> Result<Engine, DslError> {
        let doc = dsl::load_str(input)?;
        self.build(doc)
    }

    /// Same, reading the definition from disk.
    pub fn build_from_file(self, path: impl AsRef<Path>) -> Result<Engine, DslError> {
        let doc = dsl::load_file(path)?;
        self.build(doc)
    }

    pub fn build(self, doc: ProcessDoc) -> Result<Engine, DslError> {
        dsl::validate(&doc, &self.registry)?;
        let process = dsl::compile(
            &doc,
            self.model,
            &self.registry,
            self.http_provider,
            self.tool_step_limit,
        )?;
        tracing::info!(
            process = %process.name,
            agents = process.agents.len(),
            edges = process.edges.len(),
            "process compiled"
        );
        Ok(Engine {
            process,
            visit_limit: self.visit_limit,
            cancel: CancelHandle::new(),
        })
    }
}

/// A validated, runnable process.
pub struct Engine {
    process: Process,
    visit_limit: usize,
    cancel: CancelHandle,
}

impl Engine {
    pub fn builder(model: Arc<dyn ModelClient>) -> EngineBuilder {
        EngineBuilder::new(model)
    }

    /// Construct from a YAML string with default collaborators.
    pub fn from_yaml(input: &str, model: Arc<dyn ModelClient>) -> Result<Self, DslError> {
        Self::builder(model).build_from_str(input)
    }

    pub fn process(&self) -> &Process {
        &self.process
    }

    /// Handle for cancelling runs of this engine.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run the process to termination. Never fails: every runtime fault is
    /// observable in the returned state.
    pub async fn run(&self, initial_context: Section) -> GlobalState {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "process_run",
            process = %self.process.name,
            run_id = %run_id
        );
        self.run_inner(initial_context).instrument(span).await
    }

    async fn run_inner(&self, initial_context: Section) -> GlobalState {
        let mut state = GlobalState::with_context(initial_context);
        let mut current = self.process.start.clone();
        let mut visits: HashMap<String, usize> = HashMap::new();

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(node = %current, "run cancelled");
                state = state.apply(
                    &AgentOutput::default().with_message(LogEntry::new(&current, "cancelled")),
                );
                break;
            }

            if current == END_NODE {
                break;
            }

            if let Some(done) = &self.process.done_condition {
                match done.evaluate(&state) {
                    Ok(true) => {
                        tracing::info!(node = %current, "done condition met");
                        state = state.apply(
                            &AgentOutput::default().with_message(LogEntry::new(&current, "done")),
                        );
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        state = state.apply(&expression_error_entry(&current, done.source(), &e));
                    }
                }
            }

            let count = visits.entry(current.clone()).or_insert(0);
            *count += 1;
            if *count > self.visit_limit {
                let marker = format!(
                    "loop-guard: node '{current}' exceeded {} visits",
                    self.visit_limit
                );
                tracing::warn!(node = %current, "{marker}");
                state = state.apply(
                    &AgentOutput::default()
                        .with_quality("error", Value::String(marker))
                        .with_message(LogEntry::new(&current, "loop-guard")),
                );
                break;
            }

            let agent = match self.process.agents.get(&current) {
                Some(agent) => agent,
                None => {
                    tracing::error!(node = %current, "routed to undefined agent");
                    break;
                }
            };

            let delta = match agent.execute(&state).await {
                Ok(delta) => delta,
                Err(e) => {
                    tracing::warn!(node = %current, error = %e, "agent fault captured");
                    AgentOutput::default()
                        .with_quality("error", Value::String(e.to_string()))
                        .with_message(
                            LogEntry::new(&current, "error")
                                .with_detail(json!({"message": e.to_string()})),
                        )
                }
            };

            state = state.apply(&delta);
            state =
                state.apply(&AgentOutput::default().with_message(LogEntry::new(&current, "step")));

            match self.select_edge(&current, &mut state) {
                Some(next) if next == END_NODE => break,
                Some(next) => {
                    tracing::debug!(from = %current, to = %next, "edge taken");
                    current = next;
                }
                None => {
                    tracing::debug!(node = %current, "no matching outgoing edge");
                    break;
                }
            }
        }

        state
    }

    /// First matching conditional edge wins, in declaration order; the
    /// first unconditional edge is the fallback. A condition that fails to
    /// evaluate counts as non-matching and is logged in `messages`.
    fn select_edge(&self, current: &str, state: &mut GlobalState) -> Option<String> {
        let outgoing: Vec<&Edge> = self
            .process
            .edges
            .iter()
            .filter(|edge| edge.from == current)
            .collect();

        if outgoing.is_empty() {
            return self.implicit_route(current, state);
        }

        for edge in &outgoing {
            if let Some(condition) = &edge.condition {
                match condition.evaluate(state) {
                    Ok(true) => return Some(edge.to.clone()),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            node = current,
                            condition = condition.source(),
                            error = %e,
                            "edge condition failed to evaluate"
                        );
                        *state = state.apply(&expression_error_entry(current, condition.source(), &e));
                    }
                }
            }
        }

        outgoing
            .iter()
            .find(|edge| edge.condition.is_none())
            .map(|edge| edge.to.clone())
    }

    /// Routing for nodes with no declared outgoing edges, which only
    /// supervisor-centric graphs produce: a supervisor follows the
    /// `quality.next_agent` it just wrote, and a worker listed in some
    /// supervisor's roster returns to that supervisor.
    fn implicit_route(&self, current: &str, state: &GlobalState) -> Option<String> {
        let agent = self.process.agents.get(current)?;

        if agent.as_supervisor().is_some() {
            let next = state.quality.get("next_agent").and_then(Value::as_str)?;
            if next == FINISH {
                return Some(END_NODE.to_string());
            }
            if self.process.agents.contains_key(next) {
                return Some(next.to_string());
            }
            tracing::warn!(node = current, next, "supervisor chose undefined agent");
            return None;
        }

        self.process
            .agents
            .iter()
            .find(|(_, node)| {
                node.as_supervisor()
                    .is_some_and(|sup| sup.available_agents().iter().any(|a| a == current))
            })
            .map(|(name, _)| name.clone())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("process", &self.process)
            .field("visit_limit", &self.visit_limit)
            .finish()
    }
}

fn expression_error_entry(
    node: &str,
    condition: &str,
    error: &crate::error::ExprError,
) -> AgentOutput {
    AgentOutput::default().with_message(
        LogEntry::new(node, "expression-error").with_detail(json!({
            "condition": condition,
            "error": error.to_string(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::SimulatedModelClient;

    #[test]
    fn cancel_handle_round_trip() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
        handle.clone().cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn builder_rejects_invalid_definitions_before_compilation() {
        let result = Engine::builder(Arc::new(SimulatedModelClient::default())).build_from_str(
            r#"
process: {name: p, start: ghost}
agents:
  a: {kind: llm, model_name: m, prompt_template: p, output_key: k}
edges:
  - {from: a, to: __end__}
"#,
        );
        assert!(matches!(result, Err(DslError::UnknownStart(_))));
    }

    #[tokio::test]
    async fn run_terminates_on_terminal_edge() {
        let engine = Engine::builder(Arc::new(SimulatedModelClient::new("done")))
            .build_from_str(
                r#"
process: {name: single, start: writer}
agents:
  writer: {kind: llm, model_name: m, prompt_template: "Write", output_key: draft}
edges:
  - {from: writer, to: __end__}
"#,
            )
            .unwrap();

        let state = engine.run(Section::new()).await;
        assert!(state.artifacts.contains_key("draft"));
        let steps: Vec<_> = state
            .messages
            .iter()
            .filter(|m| m.kind == "step")
            .map(|m| m.agent.as_str())
            .collect();
        assert_eq!(steps, vec!["writer"]);
    }
}
