//! Condition expression evaluator for edge traversal decisions
//!
//! Grammar:
//!
//! ```text
//! Expr     = Clause ( '&&' Clause )*
//! Clause   = Key Operator Literal
//! Operator = '=' | '!='
//! ```
//!
//! Keys resolve against the node's `Outcome` and the shared `Context`;
//! all comparisons are string comparisons. An empty or whitespace-only
//! expression is unconditional (true). Malformed clauses are a
//! configuration error, not a runtime outcome.

use thiserror::Error;

use skein_model::{Context, Outcome};

/// Error for a clause that cannot be parsed
#[derive(Debug, Clone, Error)]
pub enum ConditionError {
    /// The clause contains no `=` or `!=` operator
    #[error("invalid clause (no operator found): '{0}'")]
    MalformedClause(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
}

/// Resolve a condition key to its string value.
///
/// - `outcome` -> the outcome status string (`success`, `fail`, ...)
/// - `preferred_label` -> the outcome's preferred label
/// - `context.X` -> context lookup of the literal key `context.X`,
///   falling back to the bare suffix `X`, else empty
/// - any other key -> direct context lookup, else empty
pub fn resolve_key(key: &str, outcome: &Outcome, context: &Context) -> String {
    if key == "outcome" {
        return outcome.status.as_str().to_string();
    }
    if key == "preferred_label" {
        return outcome.preferred_label.clone();
    }
    if let Some(suffix) = key.strip_prefix("context.") {
        if context.contains(key) {
            return context.get_string(key);
        }
        return context.get_string(suffix);
    }
    context.get_string(key)
}

/// Split a clause into key, operator, literal.
///
/// `!=` is checked before `=` to avoid a false partial match inside it.
fn parse_clause(clause: &str) -> std::result::Result<(&str, Operator, &str), ConditionError> {
    let clause = clause.trim();

    if let Some(idx) = clause.find("!=") {
        let key = clause[..idx].trim();
        let literal = clause[idx + 2..].trim();
        return Ok((key, Operator::Ne, literal));
    }

    if let Some(idx) = clause.find('=') {
        let key = clause[..idx].trim();
        let literal = clause[idx + 1..].trim();
        return Ok((key, Operator::Eq, literal));
    }

    Err(ConditionError::MalformedClause(clause.to_string()))
}

/// Evaluate a condition expression against the current outcome and
/// context. Clauses joined by `&&` are AND-combined. Every clause is
/// parsed even after a false one, so a malformed clause always
/// surfaces as an error.
pub fn evaluate(
    expr: &str,
    outcome: &Outcome,
    context: &Context,
) -> std::result::Result<bool, ConditionError> {
    if expr.trim().is_empty() {
        return Ok(true);
    }

    let mut all_hold = true;
    for clause in expr.split("&&") {
        let (key, op, literal) = parse_clause(clause)?;
        let resolved = resolve_key(key, outcome, context);
        let holds = match op {
            Operator::Eq => resolved == literal,
            Operator::Ne => resolved != literal,
        };
        all_hold = all_hold && holds;
    }
    Ok(all_hold)
}
