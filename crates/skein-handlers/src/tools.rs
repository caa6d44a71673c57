//! Named tool table for tool nodes
//!
//! Hosts register plain closures under a name; a tool node resolves its
//! function by node id first, then by label. Tools receive the node and
//! the shared context and return an optional JSON value: an object is
//! merged into the context key-by-key, any other value lands under
//! `{node_id}.result`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use skein_model::{Context, Node};

/// A registered tool function
pub type ToolFn =
    Arc<dyn Fn(&Node, &Context) -> Result<Option<Value>, String> + Send + Sync>;

/// Name-keyed table of tool functions
#[derive(Default)]
pub struct ToolTable {
    tools: RwLock<HashMap<String, ToolFn>>,
}

impl ToolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under a name, replacing any previous one
    pub fn register(
        &self,
        name: impl Into<String>,
        tool: impl Fn(&Node, &Context) -> Result<Option<Value>, String> + Send + Sync + 'static,
    ) {
        self.tools.write().insert(name.into(), Arc::new(tool));
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<ToolFn> {
        self.tools.read().get(name).map(Arc::clone)
    }

    /// All registered tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }
}
