//! Exit node handler
//!
//! The engine normally terminates when it reaches an exit node without
//! executing it; this handler exists for graphs that route through an
//! exit-typed node mid-flow or register it explicitly.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use skein_engine::{Handler, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for the pipeline exit node
#[derive(Debug, Default)]
pub struct ExitHandler;

#[async_trait]
impl Handler for ExitHandler {
    async fn execute(
        &self,
        node: &Node,
        _context: &Arc<Context>,
        graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        log::info!("pipeline '{}' reached exit node '{}'", graph.name, node.id);
        Ok(Outcome::success().with_notes("pipeline complete"))
    }
}
