//! Handler trait and type-keyed handler registry
//!
//! Each node type has exactly one handler. The registry maps type
//! strings to handlers, with a shape-based fallback so graphs can rely
//! on shape alone, and an optional default handler. It is populated at
//! setup and treated as immutable during a run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{EngineError, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Per-node-type execution strategy.
///
/// Handlers translate expected domain failures into
/// `Outcome::fail(...)`; an `Err` signals an unexpected failure, which
/// the engine charges against the node's retry budget.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Execute one node and produce its outcome.
    ///
    /// `context` and `graph` are shared across the whole run;
    /// `logs_dir` is the node's own log directory.
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        graph: &Arc<Graph>,
        logs_dir: &Path,
    ) -> Result<Outcome>;
}

/// Shape marker to handler-family mapping used when a node declares no
/// explicit type.
fn type_for_shape(shape: &str) -> Option<&'static str> {
    match shape {
        "Mdiamond" => Some("start"),
        "Msquare" => Some("exit"),
        "box" => Some("generate"),
        "hexagon" => Some("wait.human"),
        "diamond" => Some("conditional"),
        "component" => Some("parallel"),
        "tripleoctagon" => Some("parallel.fan_in"),
        "parallelogram" => Some("tool"),
        "house" => Some("stack.loop"),
        _ => None,
    }
}

/// Registry mapping node type strings to handlers.
///
/// Resolution order: explicit `node_type`, then shape-based lookup,
/// then the default handler. An unresolvable node is a configuration
/// error.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
    default: RwLock<Option<Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a named type, replacing any previous one
    pub fn register(&self, type_name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.write().insert(type_name.into(), handler);
    }

    /// Set the fallback handler used when no specific match is found
    pub fn set_default(&self, handler: Arc<dyn Handler>) {
        *self.default.write() = Some(handler);
    }

    /// Check whether a type name is registered
    pub fn has_type(&self, type_name: &str) -> bool {
        self.handlers.read().contains_key(type_name)
    }

    /// All registered type names
    pub fn type_names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Resolve the handler for a node
    pub fn resolve(&self, node: &Node) -> Result<Arc<dyn Handler>> {
        let handlers = self.handlers.read();

        if !node.node_type.is_empty() {
            if let Some(handler) = handlers.get(&node.node_type) {
                return Ok(Arc::clone(handler));
            }
        }

        if let Some(type_name) = type_for_shape(&node.shape) {
            if let Some(handler) = handlers.get(type_name) {
                return Ok(Arc::clone(handler));
            }
        }

        if let Some(handler) = self.default.read().as_ref() {
            return Ok(Arc::clone(handler));
        }

        Err(EngineError::NoHandler {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            shape: node.shape.clone(),
        })
    }
}

/// Closure-backed handler, mainly for tests and lightweight embedders
pub struct FnHandler {
    f: Box<dyn Fn(&Node, &Context) -> Outcome + Send + Sync>,
}

impl FnHandler {
    /// Wrap a closure as a handler
    pub fn new(f: impl Fn(&Node, &Context) -> Outcome + Send + Sync + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl Handler for FnHandler {
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        _graph: &Arc<Graph>,
        _logs_dir: &Path,
    ) -> Result<Outcome> {
        Ok((self.f)(node, context))
    }
}
