//! The orchestration loop: walks the graph, executes handlers under
//! retry policies, selects edges, checkpoints, and emits events
//!
//! The loop itself is single-threaded and cooperative: one node runs to
//! completion (including retry waits) before the next begins.
//! Concurrency only appears inside the parallel fan-out handler. Total
//! steps are bounded so cyclic graphs cannot run away, and the fan-in
//! poll loop is bounded by a poll budget.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::events::{EventBus, PipelineEvent};
use crate::registry::HandlerRegistry;
use crate::retry::{build_retry_policy, RetryPolicy};
use crate::selector::{select_condition_edge, select_edge};
use skein_model::{Checkpoint, Context, Graph, Node, Outcome, Status};

/// Bounds and intervals for one engine run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wait between fan-in barrier polls
    pub poll_interval: Duration,
    /// Maximum barrier polls per node before the node fails
    pub max_polls: u32,
    /// Maximum engine steps per run; bounds cyclic graphs
    pub max_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            max_polls: 600,
            max_steps: 10_000,
        }
    }
}

/// Pipeline execution engine.
///
/// Construct with a graph and a handler registry, optionally attach a
/// shared context, event bus, log directory, or a checkpoint to resume
/// from, then call [`Engine::run`].
pub struct Engine {
    graph: Arc<Graph>,
    registry: Arc<HandlerRegistry>,
    context: Arc<Context>,
    bus: Arc<EventBus>,
    logs_root: PathBuf,
    config: EngineConfig,
    run_id: String,
    checkpoint: Option<Checkpoint>,
    completed: Vec<String>,
    outcomes: HashMap<String, Outcome>,
    retries: HashMap<String, u32>,
}

impl Engine {
    /// Create an engine for one run of the given graph
    pub fn new(graph: Graph, registry: Arc<HandlerRegistry>) -> Self {
        let logs_root = PathBuf::from(format!(
            "skein-runs/{}",
            Utc::now().format("%Y%m%dT%H%M%S")
        ));
        Self {
            graph: Arc::new(graph),
            registry,
            context: Arc::new(Context::new()),
            bus: Arc::new(EventBus::new()),
            logs_root,
            config: EngineConfig::default(),
            run_id: Uuid::new_v4().to_string(),
            checkpoint: None,
            completed: Vec::new(),
            outcomes: HashMap::new(),
            retries: HashMap::new(),
        }
    }

    /// Use a pre-populated shared context
    pub fn with_context(mut self, context: Arc<Context>) -> Self {
        self.context = context;
        self
    }

    /// Use an externally owned event bus
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    /// Set the run log directory
    pub fn with_logs_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.logs_root = path.into();
        self
    }

    /// Override the run bounds
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resume a previous run from a checkpoint
    pub fn resume_from(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// The shared run context
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// The lifecycle event bus
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Completed node ids in execution order
    pub fn completed_nodes(&self) -> &[String] {
        &self.completed
    }

    /// Unique id of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Execute the full pipeline: find the start node, walk the graph,
    /// and return the final outcome.
    ///
    /// Handler-level failures are folded into the returned `Outcome`;
    /// an `Err` means a configuration error (dead end, missing handler,
    /// malformed condition) or an exhausted step budget.
    pub async fn run(&mut self) -> Result<Outcome> {
        fs::create_dir_all(&self.logs_root)?;
        self.context.set("graph.goal", self.graph.goal());
        self.write_manifest()?;

        self.bus.emit(&PipelineEvent::PipelineStarted {
            graph_name: self.graph.name.clone(),
        });

        if let Some(cp) = self.checkpoint.clone() {
            self.restore_checkpoint(&cp);
        }

        let mut current = match self.checkpoint {
            Some(_) => self.resume_node_id()?,
            None => {
                self.graph
                    .start_node()
                    .ok_or_else(|| EngineError::NoStartNode(self.graph.name.clone()))?
                    .id
                    .clone()
            }
        };

        let mut last_outcome = Outcome::success();
        let mut steps: u32 = 0;

        loop {
            steps += 1;
            if steps > self.config.max_steps {
                let error = format!("step budget exhausted after {} steps", self.config.max_steps);
                self.emit_pipeline_failed(error);
                return Err(EngineError::StepBudgetExhausted(self.config.max_steps));
            }

            // Terminal node: check goal gates, then complete
            if self.graph.is_exit(&current) {
                if let Some(gate) = self.failed_goal_gate() {
                    if let Some(target) = self.gate_retry_target(&gate) {
                        log::info!(
                            "goal gate '{}' unsatisfied, jumping to retry target '{}'",
                            gate.id,
                            target
                        );
                        current = target;
                        continue;
                    }
                    self.emit_pipeline_failed(format!(
                        "goal gate unsatisfied on {} and no retry target",
                        gate.id
                    ));
                    return Ok(Outcome::fail("goal gate unsatisfied"));
                }
                self.bus.emit(&PipelineEvent::PipelineCompleted {
                    graph_name: self.graph.name.clone(),
                    outcome: last_outcome.clone(),
                });
                return Ok(last_outcome);
            }

            let node = self
                .graph
                .node(&current)
                .ok_or_else(|| EngineError::UnknownNode(current.clone()))?
                .clone();

            self.bus.emit(&PipelineEvent::StageStarted {
                node_id: node.id.clone(),
            });
            self.context.set("current_node", node.id.clone());

            let policy = build_retry_policy(&node, &self.graph);
            let outcome = self.execute_with_retry(&node, &policy).await?;
            last_outcome = outcome.clone();

            self.completed.push(node.id.clone());
            self.outcomes.insert(node.id.clone(), outcome.clone());
            self.bus.emit(&PipelineEvent::StageCompleted {
                node_id: node.id.clone(),
                outcome: outcome.clone(),
            });

            if !outcome.context_updates.is_empty() {
                self.context.apply_updates(outcome.context_updates.clone());
            }
            self.context.set("outcome", outcome.status.as_str());
            if !outcome.preferred_label.is_empty() {
                self.context
                    .set("preferred_label", outcome.preferred_label.clone());
            }

            let path = self.save_checkpoint(&node.id)?;
            self.bus.emit(&PipelineEvent::CheckpointSaved {
                node_id: node.id.clone(),
                path: path.display().to_string(),
            });

            // A failed node advances only through a redirect target or
            // an edge whose condition explicitly matched; an
            // unconditional edge must not swallow the failure
            if outcome.failed() {
                if let Some(target) = self.redirect_target(&node) {
                    log::warn!(
                        "node '{}' exhausted its retry budget, redirecting to '{}'",
                        node.id,
                        target
                    );
                    current = target;
                    continue;
                }

                let fail_edge = {
                    let outgoing = self.graph.outgoing_edges(&node.id);
                    select_condition_edge(&outgoing, &outcome, &self.context)?
                        .map(|edge| edge.to_node.clone())
                };
                let Some(to_node) = fail_edge else {
                    self.emit_pipeline_failed(format!(
                        "stage {} failed: {}",
                        node.id, outcome.failure_reason
                    ));
                    return Ok(outcome);
                };
                if !self.graph.contains_node(&to_node) {
                    return Err(EngineError::UnknownNode(to_node));
                }
                current = to_node;
                continue;
            }

            let (loop_restart, to_node) = {
                let outgoing = self.graph.outgoing_edges(&node.id);
                match select_edge(&outgoing, &outcome, &self.context)? {
                    Some(edge) => (edge.loop_restart, edge.to_node.clone()),
                    None => {
                        self.emit_pipeline_failed(format!(
                            "dead end at node '{}': no selectable outgoing edge",
                            node.id
                        ));
                        return Err(EngineError::DeadEnd(node.id.clone()));
                    }
                }
            };

            if loop_restart {
                // A fresh pass gets a fresh retry budget
                log::info!("loop restart: {} -> {}", node.id, to_node);
                self.retries.clear();
            }

            if !self.graph.contains_node(&to_node) {
                return Err(EngineError::UnknownNode(to_node));
            }
            current = to_node;
        }
    }

    /// Execute one node under its retry policy.
    ///
    /// `Fail` outcomes and handler errors consume one attempt each;
    /// `Retry` outcomes poll without touching the budget, bounded by
    /// the configured poll budget.
    async fn execute_with_retry(&mut self, node: &Node, policy: &RetryPolicy) -> Result<Outcome> {
        let handler = self.registry.resolve(node)?;
        let stage_dir = self.logs_root.join(&node.id);
        fs::create_dir_all(&stage_dir)?;

        let max_attempts = policy.max_attempts.max(1);
        let mut attempt: u32 = 1;
        let mut polls: u32 = 0;

        loop {
            let result = handler
                .execute(node, &self.context, &self.graph, &stage_dir)
                .await;

            let outcome = match result {
                // Malformed conditions are configuration errors, not
                // attempt failures
                Err(err @ EngineError::Condition(_)) => return Err(err),
                Err(err) => {
                    let error = err.to_string();
                    if attempt < max_attempts {
                        self.note_attempt_failure(node, &error, attempt, policy).await;
                        attempt += 1;
                        continue;
                    }
                    self.bus.emit(&PipelineEvent::StageFailed {
                        node_id: node.id.clone(),
                        error: error.clone(),
                        will_retry: false,
                    });
                    let outcome = Outcome::fail(error);
                    self.write_status(&stage_dir, &outcome);
                    return Ok(outcome);
                }
                Ok(outcome) => outcome,
            };

            match outcome.status {
                Status::Success | Status::PartialSuccess => {
                    self.retries.remove(&node.id);
                    self.write_status(&stage_dir, &outcome);
                    return Ok(outcome);
                }
                Status::Skipped => {
                    self.write_status(&stage_dir, &outcome);
                    return Ok(outcome);
                }
                Status::Fail => {
                    if attempt < max_attempts {
                        let error = outcome.failure_reason.clone();
                        self.note_attempt_failure(node, &error, attempt, policy).await;
                        attempt += 1;
                        continue;
                    }
                    self.bus.emit(&PipelineEvent::StageFailed {
                        node_id: node.id.clone(),
                        error: outcome.failure_reason.clone(),
                        will_retry: false,
                    });
                    self.write_status(&stage_dir, &outcome);
                    return Ok(outcome);
                }
                Status::Retry => {
                    polls += 1;
                    if polls >= self.config.max_polls {
                        let outcome = if node.allow_partial {
                            Outcome::new(Status::PartialSuccess)
                                .with_notes("poll budget exhausted, partial accepted")
                        } else {
                            Outcome::fail(format!("poll budget exhausted after {polls} polls"))
                        };
                        self.write_status(&stage_dir, &outcome);
                        return Ok(outcome);
                    }
                    log::debug!("node '{}' waiting (poll {}): {}", node.id, polls, outcome.notes);
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Emit failure/retry events, bump the counter, and wait out the
    /// backoff delay for one consumed attempt.
    async fn note_attempt_failure(
        &mut self,
        node: &Node,
        error: &str,
        attempt: u32,
        policy: &RetryPolicy,
    ) {
        self.bus.emit(&PipelineEvent::StageFailed {
            node_id: node.id.clone(),
            error: error.to_string(),
            will_retry: true,
        });
        let delay = policy.delay_for_attempt(attempt);
        self.bus.emit(&PipelineEvent::StageRetrying {
            node_id: node.id.clone(),
            attempt,
            delay,
        });
        *self.retries.entry(node.id.clone()).or_insert(0) += 1;
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    }

    fn emit_pipeline_failed(&self, error: String) {
        self.bus.emit(&PipelineEvent::PipelineFailed {
            graph_name: self.graph.name.clone(),
            error,
        });
    }

    /// First completed goal-gate node that did not succeed
    fn failed_goal_gate(&self) -> Option<Node> {
        for id in &self.completed {
            let node = self.graph.node(id)?;
            if node.goal_gate {
                if let Some(outcome) = self.outcomes.get(id) {
                    if !outcome.succeeded() {
                        return Some(node.clone());
                    }
                }
            }
        }
        None
    }

    /// Retry target for an unsatisfied goal gate: node fields first,
    /// then graph-level attributes.
    fn gate_retry_target(&self, node: &Node) -> Option<String> {
        let candidates = [
            node.retry_target.as_str(),
            node.fallback_retry_target.as_str(),
            self.graph
                .attributes
                .get("retry_target")
                .map(String::as_str)
                .unwrap_or(""),
            self.graph
                .attributes
                .get("fallback_retry_target")
                .map(String::as_str)
                .unwrap_or(""),
        ];
        candidates
            .into_iter()
            .find(|t| !t.is_empty() && self.graph.contains_node(t))
            .map(str::to_string)
    }

    /// Redirect target for a node that exhausted its retry budget
    fn redirect_target(&self, node: &Node) -> Option<String> {
        [&node.retry_target, &node.fallback_retry_target]
            .into_iter()
            .find(|t| !t.is_empty() && self.graph.contains_node(t))
            .cloned()
    }

    fn restore_checkpoint(&mut self, cp: &Checkpoint) {
        self.completed = cp.completed_nodes.clone();
        self.retries = cp.node_retries.clone();
        self.context.apply_updates(cp.context_values.clone());
        for entry in &cp.logs {
            self.context.append_log(entry.clone());
        }
    }

    /// Node to resume at: the first outgoing edge of the last completed
    /// node, else the start node.
    fn resume_node_id(&self) -> Result<String> {
        if let Some(last) = self.completed.last() {
            if let Some(edge) = self.graph.outgoing_edges(last).first() {
                return Ok(edge.to_node.clone());
            }
        }
        self.graph
            .start_node()
            .map(|n| n.id.clone())
            .ok_or_else(|| EngineError::NoStartNode(self.graph.name.clone()))
    }

    fn save_checkpoint(&self, node_id: &str) -> Result<PathBuf> {
        let cp = Checkpoint::create_now(
            node_id,
            self.completed.clone(),
            self.retries.clone(),
            self.context.snapshot(),
            self.context.logs(),
        );
        let path = self.logs_root.join("checkpoint.json");
        cp.save(&path)?;
        Ok(path)
    }

    fn write_manifest(&self) -> Result<()> {
        let manifest = serde_json::json!({
            "name": self.graph.name,
            "goal": self.graph.goal(),
            "run_id": self.run_id,
            "started_at": Utc::now().to_rfc3339(),
        });
        let raw = serde_json::to_string_pretty(&manifest)
            .map_err(skein_model::CheckpointError::from)?;
        fs::write(self.logs_root.join("manifest.json"), raw)?;
        Ok(())
    }

    /// Best-effort per-stage status file; failure to write is logged,
    /// not fatal.
    fn write_status(&self, stage_dir: &Path, outcome: &Outcome) {
        let status = serde_json::json!({
            "outcome": outcome.status.as_str(),
            "preferred_next_label": outcome.preferred_label,
            "suggested_next_ids": outcome.suggested_next_ids,
            "context_updates": outcome.context_updates,
            "notes": outcome.notes,
            "failure_reason": outcome.failure_reason,
        });
        let raw = match serde_json::to_string_pretty(&status) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("could not serialize status for {}: {err}", stage_dir.display());
                return;
            }
        };
        if let Err(err) = fs::write(stage_dir.join("status.json"), raw) {
            log::warn!("could not write status for {}: {err}", stage_dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FnHandler;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use skein_model::Edge;

    fn base_registry() -> Arc<HandlerRegistry> {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register("start", Arc::new(FnHandler::new(|_, _| Outcome::success())));
        registry.register("exit", Arc::new(FnHandler::new(|_, _| Outcome::success())));
        registry
    }

    fn linear_graph() -> Graph {
        let mut graph = Graph::new("linear");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        graph.add_node(Node::new("work").with_shape("box"));
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "work"));
        graph.add_edge(Edge::new("work", "exit"));
        graph
    }

    fn collecting_bus() -> (Arc<EventBus>, Arc<Mutex<Vec<String>>>) {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.on_all(move |event| {
            let tag = match event {
                PipelineEvent::PipelineStarted { .. } => "pipeline_started".to_string(),
                PipelineEvent::PipelineCompleted { .. } => "pipeline_completed".to_string(),
                PipelineEvent::PipelineFailed { .. } => "pipeline_failed".to_string(),
                PipelineEvent::StageStarted { node_id } => format!("stage_started:{node_id}"),
                PipelineEvent::StageCompleted { node_id, .. } => {
                    format!("stage_completed:{node_id}")
                }
                PipelineEvent::StageFailed { node_id, will_retry, .. } => {
                    format!("stage_failed:{node_id}:{will_retry}")
                }
                PipelineEvent::StageRetrying { node_id, attempt, .. } => {
                    format!("stage_retrying:{node_id}:{attempt}")
                }
                PipelineEvent::CheckpointSaved { node_id, .. } => {
                    format!("checkpoint_saved:{node_id}")
                }
            };
            sink.lock().unwrap().push(tag);
        });
        (bus, seen)
    }

    #[tokio::test]
    async fn test_linear_run_completes() {
        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|node, _| {
                Outcome::success().with_update(format!("{}.response", node.id), "done")
            })),
        );

        let dir = tempfile::tempdir().unwrap();
        let (bus, seen) = collecting_bus();
        let mut engine = Engine::new(linear_graph(), registry)
            .with_event_bus(bus)
            .with_logs_root(dir.path().join("run"));

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(engine.completed_nodes(), ["start", "work"]);
        assert_eq!(
            engine.context().get_string("work.response"),
            "done"
        );

        let events = seen.lock().unwrap().clone();
        assert_eq!(events.first().unwrap(), "pipeline_started");
        assert_eq!(events.last().unwrap(), "pipeline_completed");
        assert!(events.contains(&"stage_completed:work".to_string()));

        // Run artifacts on disk
        assert!(dir.path().join("run/manifest.json").exists());
        assert!(dir.path().join("run/checkpoint.json").exists());
        assert!(dir.path().join("run/work/status.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_consumes_attempts_then_fails_run() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Outcome::fail("backend down")
            })),
        );

        let mut graph = linear_graph();
        graph.set_attribute("default_max_retry", "2");

        let dir = tempfile::tempdir().unwrap();
        let (bus, seen) = collecting_bus();
        let mut engine = Engine::new(graph, registry)
            .with_event_bus(bus)
            .with_logs_root(dir.path().join("run"));

        let outcome = engine.run().await.unwrap();
        assert!(outcome.failed());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let events = seen.lock().unwrap().clone();
        assert!(events.contains(&"stage_failed:work:true".to_string()));
        assert!(events.contains(&"stage_failed:work:false".to_string()));
        assert!(events.contains(&"stage_retrying:work:1".to_string()));
        assert!(events.contains(&"stage_retrying:work:2".to_string()));
        assert_eq!(events.last().unwrap(), "pipeline_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_outcome_does_not_consume_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(move |_, _| {
                if counter.fetch_add(1, Ordering::SeqCst) < 5 {
                    Outcome::retry("waiting")
                } else {
                    Outcome::success()
                }
            })),
        );

        // A single attempt is enough; polls are not attempts
        let dir = tempfile::tempdir().unwrap();
        let mut engine =
            Engine::new(linear_graph(), registry).with_logs_root(dir.path().join("run"));

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_budget_bounds_barrier_wait() {
        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|_, _| Outcome::retry("never ready"))),
        );

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(linear_graph(), registry)
            .with_logs_root(dir.path().join("run"))
            .with_config(EngineConfig {
                max_polls: 3,
                ..EngineConfig::default()
            });

        let outcome = engine.run().await.unwrap();
        assert!(outcome.failed());
        assert!(outcome.failure_reason.contains("poll budget"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_target_on_exhaustion() {
        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|_, _| Outcome::fail("broken"))),
        );
        registry.register(
            "recover",
            Arc::new(FnHandler::new(|_, _| Outcome::success())),
        );

        let mut graph = Graph::new("redirect");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        let mut flaky = Node::new("flaky").with_shape("box");
        flaky.retry_target = "cleanup".to_string();
        graph.add_node(flaky);
        graph.add_node(Node::new("cleanup").with_type("recover"));
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "flaky"));
        graph.add_edge(Edge::new("flaky", "exit"));
        graph.add_edge(Edge::new("cleanup", "exit"));

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(graph, registry).with_logs_root(dir.path().join("run"));

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(engine.completed_nodes(), ["start", "flaky", "cleanup"]);
    }

    #[tokio::test]
    async fn test_dead_end_fails_loudly() {
        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|_, _| Outcome::success())),
        );

        let mut graph = Graph::new("dead-end");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        graph.add_node(Node::new("work").with_shape("box"));
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "work"));
        // No edge out of "work"

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(graph, registry).with_logs_root(dir.path().join("run"));

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EngineError::DeadEnd(id) if id == "work"));
    }

    #[tokio::test]
    async fn test_step_budget_bounds_cycles() {
        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|_, _| Outcome::success())),
        );

        let mut graph = Graph::new("cycle");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        graph.add_node(Node::new("a").with_shape("box"));
        graph.add_node(Node::new("b").with_shape("box"));
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "a"));
        graph.add_edge(Edge::new("a", "b"));
        graph.add_edge(Edge::new("b", "a"));

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(graph, registry)
            .with_logs_root(dir.path().join("run"))
            .with_config(EngineConfig {
                max_steps: 10,
                ..EngineConfig::default()
            });

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EngineError::StepBudgetExhausted(10)));
    }

    #[tokio::test]
    async fn test_goal_gate_redirects_then_completes() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(move |_, _| {
                // First pass is skipped (gate unsatisfied), second succeeds
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Outcome::new(Status::Skipped)
                } else {
                    Outcome::success()
                }
            })),
        );

        let mut graph = Graph::new("gated");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        let mut gate = Node::new("verify").with_shape("box");
        gate.goal_gate = true;
        gate.retry_target = "verify".to_string();
        graph.add_node(gate);
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "verify"));
        graph.add_edge(Edge::new("verify", "exit"));

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(graph, registry).with_logs_root(dir.path().join("run"));

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_resume_skips_completed_nodes() {
        let registry = base_registry();
        let executed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&executed);
        registry.register(
            "generate",
            Arc::new(FnHandler::new(move |node, _| {
                sink.lock().unwrap().push(node.id.clone());
                Outcome::success()
            })),
        );

        let mut graph = Graph::new("resumable");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        graph.add_node(Node::new("first").with_shape("box"));
        graph.add_node(Node::new("second").with_shape("box"));
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "first"));
        graph.add_edge(Edge::new("first", "second"));
        graph.add_edge(Edge::new("second", "exit"));

        let mut values = HashMap::new();
        values.insert("first.response".to_string(), serde_json::json!("cached"));
        let cp = Checkpoint::create_now(
            "first",
            vec!["start".to_string(), "first".to_string()],
            HashMap::new(),
            values,
            Vec::new(),
        );

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(graph, registry)
            .with_logs_root(dir.path().join("run"))
            .resume_from(cp);

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.status, Status::Success);
        // Only "second" runs; "start" and "first" came from the checkpoint
        assert_eq!(*executed.lock().unwrap(), vec!["second"]);
        assert_eq!(engine.context().get_string("first.response"), "cached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_routes_through_fail_edge() {
        let registry = base_registry();
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|_, _| Outcome::fail("no good"))),
        );
        registry.register(
            "recover",
            Arc::new(FnHandler::new(|_, _| Outcome::success())),
        );

        let mut graph = Graph::new("fail-edge");
        graph.add_node(Node::new("start").with_shape("Mdiamond"));
        graph.add_node(Node::new("work").with_shape("box"));
        graph.add_node(Node::new("triage").with_type("recover"));
        graph.add_node(Node::new("exit").with_shape("Msquare"));
        graph.add_edge(Edge::new("start", "work"));
        graph.add_edge(Edge::new("work", "exit").with_condition("outcome=success"));
        graph.add_edge(Edge::new("work", "triage").with_condition("outcome=fail"));
        graph.add_edge(Edge::new("triage", "exit"));

        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(graph, registry).with_logs_root(dir.path().join("run"));

        let outcome = engine.run().await.unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(engine.completed_nodes(), ["start", "work", "triage"]);
    }
}
