//! Skein Model - Core data types for the Skein pipeline engine
//!
//! This crate defines the immutable graph description, the shared run
//! context, and the result/snapshot types that the engine and its node
//! handlers exchange:
//!
//! - `Graph`, `Node`, `Edge`: the workflow description
//! - `Context`: thread-safe key/value state shared across a run
//! - `Outcome` / `Status`: the structured result of one node execution
//! - `Checkpoint`: a serializable snapshot of engine progress
//! - `Question` / `Answer`: the human-interaction contract
//! - `ArtifactStore`: in-memory artifact storage with disk spill
//!
//! No execution logic lives here; the engine and handler crates consume
//! these types.

pub mod artifact;
pub mod checkpoint;
pub mod context;
pub mod graph;
pub mod outcome;
pub mod question;

// Re-export key types
pub use artifact::{ArtifactError, ArtifactInfo, ArtifactStore};
pub use checkpoint::{Checkpoint, CheckpointError};
pub use context::Context;
pub use graph::{Edge, Graph, Node};
pub use outcome::{Outcome, Status};
pub use question::{parse_accelerator, Answer, AnswerValue, Choice, Question, QuestionType};
