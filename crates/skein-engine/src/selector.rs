//! Edge selection: the deterministic 5-step priority algorithm
//!
//! Given a node's outgoing edges, its `Outcome`, and the `Context`,
//! selection short-circuits at the first step yielding a candidate:
//!
//! 1. Condition match - edges whose condition evaluates true
//! 2. Preferred label - normalized label equality, declaration order
//! 3. Suggested next ids - first matching target, suggestion order
//! 4. Weight among unconditional edges, ties broken by ascending
//!    alphabetical `to_node`
//! 5. Fallback - rule 4 over all outgoing edges
//!
//! The same outcome and context always select the same edge.

use crate::conditions::{evaluate, ConditionError};
use skein_model::{Context, Edge, Outcome};

/// Select the next edge, or `None` when there are no outgoing edges
/// (normal termination at an exit node, or an engine-level dead end).
pub fn select_edge<'a>(
    edges: &[&'a Edge],
    outcome: &Outcome,
    context: &Context,
) -> std::result::Result<Option<&'a Edge>, ConditionError> {
    if edges.is_empty() {
        return Ok(None);
    }

    // Step 1: condition matching
    if let Some(edge) = select_condition_edge(edges, outcome, context)? {
        return Ok(Some(edge));
    }

    // Step 2: preferred label
    if !outcome.preferred_label.is_empty() {
        let wanted = normalize_label(&outcome.preferred_label);
        if let Some(edge) = edges.iter().find(|e| normalize_label(&e.label) == wanted) {
            return Ok(Some(edge));
        }
    }

    // Step 3: suggested next ids
    for sid in &outcome.suggested_next_ids {
        if let Some(edge) = edges.iter().find(|e| &e.to_node == sid) {
            return Ok(Some(edge));
        }
    }

    // Steps 4 & 5: weight with lexical tiebreak, unconditional first
    let unconditional: Vec<&Edge> = edges
        .iter()
        .copied()
        .filter(|e| e.condition.is_empty())
        .collect();
    if !unconditional.is_empty() {
        return Ok(Some(best_by_weight_then_lexical(&unconditional)));
    }

    Ok(Some(best_by_weight_then_lexical(edges)))
}

/// Select among condition-matched edges only.
///
/// This is step 1 of the full algorithm, and also the whole algorithm
/// for routing out of a failed node: an unconditional edge must not
/// swallow a failure, so a failed node advances only through an edge
/// whose condition explicitly matched.
pub fn select_condition_edge<'a>(
    edges: &[&'a Edge],
    outcome: &Outcome,
    context: &Context,
) -> std::result::Result<Option<&'a Edge>, ConditionError> {
    let mut matched = Vec::new();
    for edge in edges {
        if !edge.condition.is_empty() && evaluate(&edge.condition, outcome, context)? {
            matched.push(*edge);
        }
    }
    if matched.is_empty() {
        return Ok(None);
    }
    Ok(Some(best_by_weight_then_lexical(&matched)))
}

/// Highest weight wins; ties break to the alphabetically smallest
/// `to_node`, independent of input order.
fn best_by_weight_then_lexical<'a>(edges: &[&'a Edge]) -> &'a Edge {
    let mut best = edges[0];
    for edge in &edges[1..] {
        if edge.weight > best.weight || (edge.weight == best.weight && edge.to_node < best.to_node)
        {
            best = edge;
        }
    }
    best
}

/// Normalize an edge label for comparison: lowercase, trim, then strip
/// a single leading accelerator marker (`[k] `, `k) `, `k - `).
pub fn normalize_label(label: &str) -> String {
    let label = label.trim().to_lowercase();
    let chars: Vec<char> = label.chars().collect();

    // [k] prefix
    if chars.len() >= 3 && chars[0] == '[' && chars[1].is_alphanumeric() && chars[2] == ']' {
        return chars[3..].iter().collect::<String>().trim_start().to_string();
    }
    // k) prefix
    if chars.len() >= 2 && chars[0].is_alphanumeric() && chars[1] == ')' {
        return chars[2..].iter().collect::<String>().trim_start().to_string();
    }
    // k - prefix
    if chars.len() >= 2 && chars[0].is_alphanumeric() {
        let rest: String = chars[1..].iter().collect();
        let trimmed = rest.trim_start();
        if let Some(stripped) = trimmed.strip_prefix('-') {
            return stripped.trim_start().to_string();
        }
    }

    label
}
