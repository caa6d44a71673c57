//! Checkpoint model: serializable pipeline state for resume support

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors when persisting or restoring a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// I/O error reading or writing the checkpoint file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Snapshot of pipeline execution state, persisted after each completed
/// node and used to resume a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// ISO-8601 creation time
    pub timestamp: String,
    /// The node that most recently completed
    pub current_node: String,
    /// Completed node ids in execution order
    #[serde(default)]
    pub completed_nodes: Vec<String>,
    /// Per-node attempt counters
    #[serde(default)]
    pub node_retries: HashMap<String, u32>,
    /// Full context snapshot
    #[serde(default)]
    pub context_values: HashMap<String, Value>,
    /// Run log entries
    #[serde(default)]
    pub logs: Vec<String>,
}

impl Checkpoint {
    /// Create a checkpoint stamped with the current UTC time
    pub fn create_now(
        current_node: impl Into<String>,
        completed_nodes: Vec<String>,
        node_retries: HashMap<String, u32>,
        context_values: HashMap<String, Value>,
        logs: Vec<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            current_node: current_node.into(),
            completed_nodes,
            node_retries,
            context_values,
            logs,
        }
    }

    /// Serialize to pretty JSON and write to `path`, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a checkpoint from a JSON file at `path`
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
