//! Fan-in barrier handler
//!
//! Joins parallel branches: succeeds once every predecessor (every node
//! with an edge into this one) has published a truthy
//! `{predecessor_id}.complete` marker, and asks the engine to poll
//! again otherwise. The engine bounds the polling, so a branch that
//! never completes fails this node rather than hanging the run.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::control::is_truthy;
use skein_engine::{Handler, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for parallel join nodes
#[derive(Debug, Default)]
pub struct FanInHandler;

#[async_trait]
impl Handler for FanInHandler {
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        let mut predecessors: Vec<&str> = Vec::new();
        for edge in graph.incoming_edges(&node.id) {
            if !predecessors.contains(&edge.from_node.as_str()) {
                predecessors.push(&edge.from_node);
            }
        }

        if predecessors.is_empty() {
            return Ok(Outcome::success().with_notes("no predecessors to wait for"));
        }

        let missing: Vec<&str> = predecessors
            .into_iter()
            .filter(|pred| {
                let marker = context.get(&format!("{pred}.complete"));
                !is_truthy(marker.as_ref())
            })
            .collect();

        if missing.is_empty() {
            return Ok(Outcome::success());
        }

        Ok(Outcome::retry(format!(
            "waiting for branches: {}",
            missing.join(", ")
        )))
    }
}
