//! Outcome model: the structured result of executing one node
//!
//! Every handler invocation produces a fresh `Outcome`; it is never
//! mutated after construction. `Retry` is a poll request, not a
//! failure: the engine re-invokes the node without charging the retry
//! budget.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a node execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The node completed successfully
    Success,
    /// The node failed; consumes a retry attempt
    Fail,
    /// The node completed with partial results
    PartialSuccess,
    /// The node is waiting on a condition; re-invoke without charging
    /// the retry budget
    Retry,
    /// The node was skipped
    Skipped,
}

impl Status {
    /// The wire/string form used in conditions and checkpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Fail => "fail",
            Status::PartialSuccess => "partial_success",
            Status::Retry => "retry",
            Status::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result produced by a node handler after execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    /// Execution status
    pub status: Status,
    /// Edge-label hint for the edge selector
    pub preferred_label: String,
    /// Ordered fallback target node ids for the edge selector
    pub suggested_next_ids: Vec<String>,
    /// Key/value merge applied to the shared context on success
    pub context_updates: HashMap<String, Value>,
    /// Diagnostic notes
    pub notes: String,
    /// Reason text when `status` is `Fail`
    pub failure_reason: String,
}

impl Outcome {
    /// Create an outcome with the given status and empty fields
    pub fn new(status: Status) -> Self {
        Self {
            status,
            preferred_label: String::new(),
            suggested_next_ids: Vec::new(),
            context_updates: HashMap::new(),
            notes: String::new(),
            failure_reason: String::new(),
        }
    }

    /// A plain success outcome
    pub fn success() -> Self {
        Self::new(Status::Success)
    }

    /// A failure outcome with a reason
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            failure_reason: reason.into(),
            ..Self::new(Status::Fail)
        }
    }

    /// A retry (poll) outcome with a note
    pub fn retry(notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            ..Self::new(Status::Retry)
        }
    }

    /// Set the preferred edge label
    pub fn with_preferred_label(mut self, label: impl Into<String>) -> Self {
        self.preferred_label = label.into();
        self
    }

    /// Set the suggested next node ids
    pub fn with_suggested_next_ids(mut self, ids: Vec<String>) -> Self {
        self.suggested_next_ids = ids;
        self
    }

    /// Set the context updates map
    pub fn with_updates(mut self, updates: HashMap<String, Value>) -> Self {
        self.context_updates = updates;
        self
    }

    /// Add a single context update
    pub fn with_update(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context_updates.insert(key.into(), value.into());
        self
    }

    /// Set the diagnostic notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// True for `Success` and `PartialSuccess`
    pub fn succeeded(&self) -> bool {
        matches!(self.status, Status::Success | Status::PartialSuccess)
    }

    /// True only for `Fail`
    pub fn failed(&self) -> bool {
        self.status == Status::Fail
    }
}
