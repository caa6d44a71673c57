//! Parallel fan-out handler
//!
//! Runs the branch nodes named in the prompt (comma-separated node
//! ids) concurrently, each resolved through the shared registry and
//! executed once against the shared context. Branch updates merge in
//! completion order, last writer wins; branches that need determinism
//! namespace their keys.
//!
//! Each successful branch gets a `{branch_id}.complete` marker for the
//! downstream fan-in barrier, and the fan-out node always records its
//! own `{node_id}.complete` marker.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinSet;

use skein_engine::{EngineError, Handler, HandlerRegistry, Result};
use skein_model::{Context, Graph, Node, Outcome, Status};

/// Handler for concurrent branch execution
pub struct ParallelHandler {
    registry: Weak<HandlerRegistry>,
}

impl ParallelHandler {
    /// Create a parallel handler resolving branches through `registry`.
    ///
    /// The reference is weak to break the registry -> handler ->
    /// registry cycle.
    pub fn new(registry: Weak<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

/// Branch node ids from a comma-separated prompt
pub(crate) fn branch_ids(prompt: &str) -> Vec<String> {
    prompt
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Handler for ParallelHandler {
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        graph: &Arc<Graph>,
        logs_dir: &Path,
    ) -> Result<Outcome> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| EngineError::handler("handler registry dropped"))?;

        let ids = branch_ids(&node.prompt);
        if ids.is_empty() {
            return Ok(Outcome::success()
                .with_notes("no branches configured")
                .with_update(format!("{}.complete", node.id), true));
        }

        let mut set = JoinSet::new();
        for id in ids {
            let Some(child) = graph.node(&id).cloned() else {
                return Ok(Outcome::fail(format!("unknown branch node '{id}'")));
            };
            let handler = registry.resolve(&child)?;
            let ctx = Arc::clone(context);
            let graph = Arc::clone(graph);
            let dir = logs_dir.join(&child.id);

            set.spawn(async move {
                if let Err(err) = tokio::fs::create_dir_all(&dir).await {
                    log::warn!("could not create branch log dir for '{}': {err}", child.id);
                }
                let result = handler.execute(&child, &ctx, &graph, &dir).await;
                (child.id, result)
            });
        }

        let mut updates: HashMap<String, Value> = HashMap::new();
        let mut succeeded = 0usize;
        let mut failures: Vec<String> = Vec::new();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, Ok(outcome))) => {
                    if outcome.succeeded() {
                        log::debug!("branch '{id}' completed: {}", outcome.status);
                        succeeded += 1;
                        updates.insert(format!("{id}.complete"), Value::Bool(true));
                    } else {
                        failures.push(format!("{id}: {}", outcome.failure_reason));
                    }
                    // Updates merge whether or not the branch succeeded;
                    // a failed branch may still have produced evidence
                    updates.extend(outcome.context_updates);
                }
                Ok((id, Err(err))) => failures.push(format!("{id}: {err}")),
                Err(err) => failures.push(format!("branch task panicked: {err}")),
            }
        }

        updates.insert(format!("{}.complete", node.id), Value::Bool(true));

        let outcome = if failures.is_empty() {
            Outcome::success()
        } else if succeeded > 0 {
            Outcome::new(Status::PartialSuccess)
                .with_notes(format!("failed branches: {}", failures.join("; ")))
        } else {
            Outcome::fail(format!("all branches failed: {}", failures.join("; ")))
        };
        Ok(outcome.with_updates(updates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skein_engine::FnHandler;

    fn fan_out_graph() -> Graph {
        let mut graph = Graph::new("g");
        graph.add_node(Node::new("fan").with_shape("component").with_prompt("left, right"));
        graph.add_node(Node::new("left").with_shape("box"));
        graph.add_node(Node::new("right").with_shape("box"));
        graph
    }

    #[tokio::test]
    async fn test_branches_run_and_merge() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|node, _| {
                Outcome::success().with_update(format!("{}.response", node.id), "done")
            })),
        );
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let graph = Arc::new(fan_out_graph());
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.context_updates.get("left.response"), Some(&json!("done")));
        assert_eq!(outcome.context_updates.get("right.response"), Some(&json!("done")));
        assert_eq!(outcome.context_updates.get("left.complete"), Some(&json!(true)));
        assert_eq!(outcome.context_updates.get("right.complete"), Some(&json!(true)));
        assert_eq!(outcome.context_updates.get("fan.complete"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_partial_success_when_one_branch_fails() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|node, _| {
                if node.id == "right" {
                    Outcome::fail("right broke")
                } else {
                    Outcome::success()
                }
            })),
        );
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let graph = Arc::new(fan_out_graph());
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::PartialSuccess);
        assert!(outcome.notes.contains("right broke"));
        assert_eq!(outcome.context_updates.get("left.complete"), Some(&json!(true)));
        assert!(!outcome.context_updates.contains_key("right.complete"));
    }

    #[tokio::test]
    async fn test_failed_branch_updates_still_merge() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|node, _| {
                if node.id == "right" {
                    Outcome::fail("right broke").with_update("right.partial", "evidence")
                } else {
                    Outcome::success()
                }
            })),
        );
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let graph = Arc::new(fan_out_graph());
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::PartialSuccess);
        assert_eq!(
            outcome.context_updates.get("right.partial"),
            Some(&json!("evidence"))
        );
        assert!(!outcome.context_updates.contains_key("right.complete"));
    }

    #[tokio::test]
    async fn test_three_branches_with_one_failure() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|node, _| {
                if node.id == "gamma" {
                    Outcome::fail("gamma broke")
                } else {
                    Outcome::success().with_update(format!("{}.out", node.id), "ok")
                }
            })),
        );
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let mut graph = Graph::new("g");
        graph.add_node(
            Node::new("fan")
                .with_shape("component")
                .with_prompt("alpha, beta, gamma"),
        );
        graph.add_node(Node::new("alpha").with_shape("box"));
        graph.add_node(Node::new("beta").with_shape("box"));
        graph.add_node(Node::new("gamma").with_shape("box"));
        let graph = Arc::new(graph);
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::PartialSuccess);
        assert!(outcome.notes.contains("gamma broke"));
        assert_eq!(outcome.context_updates.get("alpha.complete"), Some(&json!(true)));
        assert_eq!(outcome.context_updates.get("beta.complete"), Some(&json!(true)));
        assert!(!outcome.context_updates.contains_key("gamma.complete"));
        assert_eq!(outcome.context_updates.get("alpha.out"), Some(&json!("ok")));
        assert_eq!(outcome.context_updates.get("beta.out"), Some(&json!("ok")));
    }

    #[tokio::test]
    async fn test_overlapping_key_keeps_exactly_one_writer() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|node, _| {
                Outcome::success().with_update("shared", node.id.clone())
            })),
        );
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let graph = Arc::new(fan_out_graph());
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        // Last writer wins in completion order; either branch may win,
        // but both completion markers always land
        let shared = outcome.context_updates.get("shared").cloned();
        assert!(shared == Some(json!("left")) || shared == Some(json!("right")));
        assert_eq!(outcome.context_updates.get("left.complete"), Some(&json!(true)));
        assert_eq!(outcome.context_updates.get("right.complete"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_all_branches_failing_fails_node() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register(
            "generate",
            Arc::new(FnHandler::new(|_, _| Outcome::fail("nope"))),
        );
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let graph = Arc::new(fan_out_graph());
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::Fail);
    }

    #[tokio::test]
    async fn test_unknown_branch_fails() {
        let registry = Arc::new(HandlerRegistry::new());
        let handler = ParallelHandler::new(Arc::downgrade(&registry));

        let mut graph = Graph::new("g");
        graph.add_node(Node::new("fan").with_shape("component").with_prompt("ghost"));
        let graph = Arc::new(graph);
        let node = graph.node("fan").unwrap().clone();
        let ctx = Arc::new(Context::new());
        let dir = tempfile::tempdir().unwrap();

        let outcome = handler
            .execute(&node, &ctx, &graph, dir.path())
            .await
            .unwrap();
        assert!(outcome.failed());
        assert!(outcome.failure_reason.contains("ghost"));
    }

    #[test]
    fn test_branch_ids_parsing() {
        assert_eq!(branch_ids("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(branch_ids(""), Vec::<String>::new());
        assert_eq!(branch_ids(" , "), Vec::<String>::new());
    }
}
