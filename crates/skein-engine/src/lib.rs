//! Skein Engine - Graph-walking execution for agent pipelines
//!
//! The engine walks a `skein_model::Graph` node by node. Each node is
//! delegated to a handler resolved through the `HandlerRegistry`, the
//! handler's `Outcome` is merged into the shared `Context`, and the
//! next edge is chosen by a deterministic 5-step priority algorithm.
//!
//! Cross-cutting pieces:
//!
//! - `conditions`: the boolean expression language used on edges
//! - `selector`: the deterministic edge-selection algorithm
//! - `retry`: backoff schedules and per-node attempt budgets
//! - `events`: the synchronous, ordered lifecycle event bus
//! - `Engine`: the orchestration loop with checkpointing and resume

pub mod conditions;
pub mod engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod retry;
pub mod selector;

// Re-export key types
pub use conditions::{evaluate, ConditionError};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, Result};
pub use events::{EventBus, EventKind, PipelineEvent};
pub use registry::{FnHandler, Handler, HandlerRegistry};
pub use retry::{build_retry_policy, BackoffConfig, RetryPolicy};
pub use selector::select_edge;
