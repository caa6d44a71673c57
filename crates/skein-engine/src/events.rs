//! Lifecycle events and the synchronous event bus
//!
//! Events are emitted by the engine after each state transition and
//! delivered synchronously, in subscription order, to any number of
//! listeners. Host applications use them to drive observability or to
//! interleave with the run (e.g. routing a wait-for-human stage to a
//! UI).

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use skein_model::Outcome;

/// Events emitted during pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The run started
    PipelineStarted {
        /// Graph name
        graph_name: String,
    },

    /// The run reached the exit node
    PipelineCompleted {
        /// Graph name
        graph_name: String,
        /// The final outcome
        outcome: Outcome,
    },

    /// The run failed
    PipelineFailed {
        /// Graph name
        graph_name: String,
        /// Failure description
        error: String,
    },

    /// A node began executing
    StageStarted {
        /// Node id
        node_id: String,
    },

    /// A node finished with a final outcome
    StageCompleted {
        /// Node id
        node_id: String,
        /// The node's outcome
        outcome: Outcome,
    },

    /// A node attempt failed
    StageFailed {
        /// Node id
        node_id: String,
        /// Failure description
        error: String,
        /// Whether retry budget remains
        will_retry: bool,
    },

    /// A node is about to be retried
    StageRetrying {
        /// Node id
        node_id: String,
        /// The attempt that just failed (1-indexed)
        attempt: u32,
        /// Computed wait in seconds before the next attempt
        delay: f64,
    },

    /// A checkpoint was written
    CheckpointSaved {
        /// Node id the checkpoint covers
        node_id: String,
        /// Checkpoint file path
        path: String,
    },
}

/// Discriminant for subscribing to one event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `PipelineStarted`
    PipelineStarted,
    /// `PipelineCompleted`
    PipelineCompleted,
    /// `PipelineFailed`
    PipelineFailed,
    /// `StageStarted`
    StageStarted,
    /// `StageCompleted`
    StageCompleted,
    /// `StageFailed`
    StageFailed,
    /// `StageRetrying`
    StageRetrying,
    /// `CheckpointSaved`
    CheckpointSaved,
}

impl PipelineEvent {
    /// The kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::PipelineStarted { .. } => EventKind::PipelineStarted,
            PipelineEvent::PipelineCompleted { .. } => EventKind::PipelineCompleted,
            PipelineEvent::PipelineFailed { .. } => EventKind::PipelineFailed,
            PipelineEvent::StageStarted { .. } => EventKind::StageStarted,
            PipelineEvent::StageCompleted { .. } => EventKind::StageCompleted,
            PipelineEvent::StageFailed { .. } => EventKind::StageFailed,
            PipelineEvent::StageRetrying { .. } => EventKind::StageRetrying,
            PipelineEvent::CheckpointSaved { .. } => EventKind::CheckpointSaved,
        }
    }
}

type Listener = Box<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Synchronous publish/subscribe bus for lifecycle events.
///
/// Receive-all listeners fire before kind-specific ones; within each
/// group, delivery follows subscription order. `emit` blocks until all
/// listeners return. Subscribing from inside a listener deadlocks.
#[derive(Default)]
pub struct EventBus {
    global: RwLock<Vec<Listener>>,
    by_kind: RwLock<HashMap<EventKind, Vec<Listener>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a specific event kind
    pub fn subscribe(&self, kind: EventKind, callback: impl Fn(&PipelineEvent) + Send + Sync + 'static) {
        self.by_kind
            .write()
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }

    /// Register a callback that receives every event
    pub fn on_all(&self, callback: impl Fn(&PipelineEvent) + Send + Sync + 'static) {
        self.global.write().push(Box::new(callback));
    }

    /// Dispatch an event to all matching listeners, synchronously and
    /// in subscription order.
    pub fn emit(&self, event: &PipelineEvent) {
        for cb in self.global.read().iter() {
            cb(event);
        }
        if let Some(listeners) = self.by_kind.read().get(&event.kind()) {
            for cb in listeners {
                cb(event);
            }
        }
    }
}
