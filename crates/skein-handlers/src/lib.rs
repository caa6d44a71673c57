//! Skein Handlers
//!
//! Built-in node handlers for the Skein pipeline engine. Each handler
//! implements one node family, keyed by node type (or inferred from
//! the node's shape marker).
//!
//! # Categories
//!
//! - **Lifecycle**: pipeline entry and exit nodes
//! - **Processing**: model generation and host tool calls
//! - **Input**: nodes that wait on a human answer
//! - **Control**: branching, parallel fan-out/fan-in, bounded loops
//!
//! Cross-cutting pieces live alongside them: the [`GenerationBackend`]
//! abstraction, the [`Interviewer`] implementations, the host
//! [`ToolTable`], and [`default_registry`] to wire everything up.

pub mod backend;
pub mod control;
pub mod input;
pub mod interviewer;
pub mod lifecycle;
pub mod processing;
pub mod setup;
pub mod tools;

// Re-export the working set for embedders
pub use backend::{BackendError, GenerationBackend, GenerationRequest, StubBackend};
pub use control::{ConditionalHandler, FanInHandler, ParallelHandler, StackLoopHandler};
pub use input::WaitHumanHandler;
pub use interviewer::{
    AutoApproveInterviewer, CallbackInterviewer, Interviewer, QAPair, QueueInterviewer,
    RecordingInterviewer,
};
pub use lifecycle::{ExitHandler, StartHandler};
pub use processing::{GenerateHandler, ToolHandler};
pub use setup::{default_registry, RegistryOptions};
pub use tools::{ToolFn, ToolTable};
