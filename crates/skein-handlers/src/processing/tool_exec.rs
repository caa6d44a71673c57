//! Tool node handler
//!
//! Resolves a host-registered tool function by node id, falling back to
//! the node label, and folds its return value into the context. An
//! object return merges key-by-key; any other value lands under
//! `{node_id}.result`. A missing tool or a tool error fails the node.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::ToolTable;
use skein_engine::{Handler, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for host tool nodes
pub struct ToolHandler {
    tools: Arc<ToolTable>,
}

impl ToolHandler {
    /// Create a tool handler over the given table
    pub fn new(tools: Arc<ToolTable>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Handler for ToolHandler {
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        _graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        let tool = self
            .tools
            .get(&node.id)
            .or_else(|| self.tools.get(&node.label));

        let Some(tool) = tool else {
            return Ok(Outcome::fail(format!(
                "no tool registered for node '{}'",
                node.id
            )));
        };

        match tool(node, context) {
            Ok(Some(Value::Object(map))) => {
                let mut outcome = Outcome::success();
                for (key, value) in map {
                    outcome = outcome.with_update(key, value);
                }
                Ok(outcome)
            }
            Ok(Some(value)) => {
                Ok(Outcome::success().with_update(format!("{}.result", node.id), value))
            }
            Ok(None) => Ok(Outcome::success()),
            Err(err) => {
                log::warn!("tool '{}' failed: {err}", node.id);
                Ok(Outcome::fail(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_graph() -> (Arc<Context>, Arc<Graph>) {
        (Arc::new(Context::new()), Arc::new(Graph::new("g")))
    }

    #[tokio::test]
    async fn test_object_return_merges_keys() {
        let table = Arc::new(ToolTable::new());
        table.register("lint", |_, _| {
            Ok(Some(json!({"lint.errors": 0, "lint.clean": true})))
        });
        let handler = ToolHandler::new(table);
        let (ctx, graph) = run_graph();

        let outcome = handler
            .execute(&Node::new("lint"), &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(outcome.context_updates.get("lint.errors"), Some(&json!(0)));
        assert_eq!(outcome.context_updates.get("lint.clean"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_scalar_return_lands_under_result() {
        let table = Arc::new(ToolTable::new());
        table.register("count", |_, _| Ok(Some(json!(42))));
        let handler = ToolHandler::new(table);
        let (ctx, graph) = run_graph();

        let outcome = handler
            .execute(&Node::new("count"), &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(outcome.context_updates.get("count.result"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_label_fallback_lookup() {
        let table = Arc::new(ToolTable::new());
        table.register("Run Tests", |_, _| Ok(None));
        let handler = ToolHandler::new(table);
        let (ctx, graph) = run_graph();

        let node = Node::new("t1").with_label("Run Tests");
        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert!(outcome.succeeded());
        assert!(outcome.context_updates.is_empty());
    }

    #[tokio::test]
    async fn test_missing_tool_fails() {
        let handler = ToolHandler::new(Arc::new(ToolTable::new()));
        let (ctx, graph) = run_graph();

        let outcome = handler
            .execute(&Node::new("ghost"), &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert!(outcome.failed());
        assert!(outcome.failure_reason.contains("no tool registered"));
    }

    #[tokio::test]
    async fn test_tool_error_fails() {
        let table = Arc::new(ToolTable::new());
        table.register("flaky", |_, _| Err("disk full".to_string()));
        let handler = ToolHandler::new(table);
        let (ctx, graph) = run_graph();

        let outcome = handler
            .execute(&Node::new("flaky"), &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert!(outcome.failed());
        assert_eq!(outcome.failure_reason, "disk full");
    }
}
