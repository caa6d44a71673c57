//! Stack loop handler
//!
//! Repeats a body of nodes (comma-separated ids in the prompt) until
//! the context flag `stack_done` turns truthy. The flag is checked at
//! the top of each pass and again after each body node, so a node that
//! sets it stops the loop immediately. Body updates are applied to the
//! shared context as soon as each node finishes, making them visible
//! to the rest of the pass.
//!
//! The loop halts at [`StackLoopHandler::MAX_ITERATIONS`] passes even
//! if the flag never turns; the halt is a success recording the pass
//! count under `{node_id}.iterations`.

use std::path::Path;
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::control::{is_truthy, parallel::branch_ids};
use skein_engine::{EngineError, Handler, HandlerRegistry, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for bounded repeat-until loops
pub struct StackLoopHandler {
    registry: Weak<HandlerRegistry>,
}

impl StackLoopHandler {
    /// Hard bound on loop passes
    pub const MAX_ITERATIONS: u32 = 100;

    /// Context flag that terminates the loop when truthy
    pub const DONE_FLAG: &'static str = "stack_done";

    /// Create a stack loop handler resolving body nodes through
    /// `registry`.
    pub fn new(registry: Weak<HandlerRegistry>) -> Self {
        Self { registry }
    }
}

fn done(context: &Context) -> bool {
    is_truthy(context.get(StackLoopHandler::DONE_FLAG).as_ref())
}

#[async_trait]
impl Handler for StackLoopHandler {
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

        let body = branch_ids(&node.prompt);
        if body.is_empty() {
            return Ok(Outcome::success().with_notes("empty loop body"));
        }

        let mut iterations: u32 = 0;
        'passes: while iterations < Self::MAX_ITERATIONS {
            iterations += 1;
            if done(context) {
                break;
            }
            log::debug!("loop '{}' pass {iterations}", node.id);

            for id in &body {
                let Some(child) = graph.node(id).cloned() else {
                    return Ok(Outcome::fail(format!("unknown loop body node '{id}'")));
                };
                let handler = registry.resolve(&child)?;
                let dir = logs_dir.join(format!("{id}.{iterations}"));
                if let Err(err) = tokio::fs::create_dir_all(&dir).await {
                    log::warn!("could not create loop log dir for '{id}': {err}");
                }

                let outcome = handler.execute(&child, context, graph, &dir).await?;
                if outcome.failed() {
                    return Ok(Outcome::fail(format!(
                        "loop body node '{id}' failed on pass {iterations}: {}",
                        outcome.failure_reason
                    ))
                    .with_update(format!("{}.iterations", node.id), iterations));
                }
                context.apply_updates(outcome.context_updates);

                if done(context) {
                    break 'passes;
                }
            }
        }

        let mut outcome =
            Outcome::success().with_update(format!("{}.iterations", node.id), iterations);
        if !done(context) {
            log::warn!(
                "loop '{}' halted at the {}-pass safety bound",
                node.id,
                Self::MAX_ITERATIONS
            );
            outcome = outcome.with_notes(format!(
                "halted at the {}-pass safety bound",
                Self::MAX_ITERATIONS
            ));
        }
        Ok(outcome)
    }
}
