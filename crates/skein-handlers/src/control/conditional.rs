//! Conditional node handler
//!
//! Routes the run by producing a preferred edge label:
//!
//! - Each outgoing edge's own condition is checked first; the first
//!   edge (in declaration order) whose condition holds wins, and its
//!   label becomes the preferred label.
//! - A prompt containing a comparison (`=`/`!=` clauses) is evaluated
//!   against the context and yields `yes` or `no`.
//! - Any other non-empty prompt is read as a context key; its value is
//!   matched case-insensitively against the outgoing edge labels.
//! - Otherwise the node produces a plain success, leaving routing
//!   entirely to edge conditions and weights.
//!
//! A malformed comparison is a graph configuration error and aborts the
//! run rather than consuming retry budget.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use skein_engine::selector::normalize_label;
use skein_engine::{evaluate, Handler, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for branch-decision nodes
#[derive(Debug, Default)]
pub struct ConditionalHandler;

#[async_trait]
impl Handler for ConditionalHandler {
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        // Edge conditions first: the first declared edge whose own
        // condition holds names the route
        let neutral = Outcome::success();
        for edge in graph.outgoing_edges(&node.id) {
            if !edge.condition.is_empty() && evaluate(&edge.condition, &neutral, context)? {
                log::debug!(
                    "conditional '{}': edge condition '{}' holds -> '{}'",
                    node.id,
                    edge.condition,
                    edge.to_node
                );
                return Ok(Outcome::success().with_preferred_label(edge.label.clone()));
            }
        }

        if node.prompt.is_empty() {
            return Ok(Outcome::success());
        }

        // Comparison prompt: evaluate and answer yes/no
        if node.prompt.contains('=') {
            let neutral = Outcome::success();
            let holds = evaluate(&node.prompt, &neutral, context)?;
            let label = if holds { "yes" } else { "no" };
            log::debug!("conditional '{}': '{}' -> {label}", node.id, node.prompt);
            return Ok(Outcome::success().with_preferred_label(label));
        }

        // Key prompt: match the context value against edge labels
        let value = context.get_string(&node.prompt);
        if !value.is_empty() {
            let wanted = value.to_lowercase();
            for edge in graph.outgoing_edges(&node.id) {
                if !edge.label.is_empty() && normalize_label(&edge.label) == wanted {
                    return Ok(Outcome::success().with_preferred_label(edge.label.clone()));
                }
            }
        }

        log::debug!(
            "conditional '{}': no label match for key '{}', deferring to edge rules",
            node.id,
            node.prompt
        );
        Ok(Outcome::success())
    }
}
