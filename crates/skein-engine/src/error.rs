//! Error types for the engine

use thiserror::Error;

use crate::conditions::ConditionError;
use skein_model::CheckpointError;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while executing a pipeline.
///
/// Configuration errors (malformed conditions, missing handlers, dead
/// ends) abort the run; handler-level failures are folded into
/// `Outcome` values instead and never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A condition expression could not be parsed
    #[error("condition error: {0}")]
    Condition(#[from] ConditionError),

    /// No handler is registered for a node's type or shape
    #[error("no handler for node '{id}' (type '{node_type}', shape '{shape}')")]
    NoHandler {
        /// Node id
        id: String,
        /// Declared node type
        node_type: String,
        /// Node shape
        shape: String,
    },

    /// The graph has no discoverable start node
    #[error("no start node found in graph '{0}'")]
    NoStartNode(String),

    /// An edge references a node id that does not exist
    #[error("edge references unknown node '{0}'")]
    UnknownNode(String),

    /// A non-exit node has no selectable outgoing edge
    #[error("dead end at node '{0}': no selectable outgoing edge")]
    DeadEnd(String),

    /// The engine step bound was exceeded (runaway cycle)
    #[error("step budget exhausted after {0} steps")]
    StepBudgetExhausted(u32),

    /// Checkpoint persistence failed
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// I/O error on the run log directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected failure inside a handler
    #[error("handler failure: {0}")]
    Handler(String),
}

impl EngineError {
    /// Create a handler failure with a message
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}
