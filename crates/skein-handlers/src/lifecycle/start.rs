//! Start node handler
//!
//! Marks the beginning of a run. Records the start timestamp so later
//! stages (and post-run tooling) can measure elapsed time.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use skein_engine::{Handler, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for the pipeline entry node
#[derive(Debug, Default)]
pub struct StartHandler;

#[async_trait]
impl Handler for StartHandler {
    async fn execute(
        &self,
        node: &Node,
        _context: &Arc<Context>,
        graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        log::info!("pipeline '{}' starting at node '{}'", graph.name, node.id);
        Ok(Outcome::success().with_update("started_at", Utc::now().to_rfc3339()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_start_time() {
        let handler = StartHandler;
        let node = Node::new("start").with_shape("Mdiamond");
        let ctx = Arc::new(Context::new());
        let graph = Arc::new(Graph::new("g"));

        let outcome = handler
            .execute(&node, &ctx, &graph, Path::new("/tmp"))
            .await
            .unwrap();
        assert!(outcome.succeeded());
        assert!(outcome.context_updates.contains_key("started_at"));
    }
}
