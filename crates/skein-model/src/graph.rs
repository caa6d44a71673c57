//! Workflow graph model: nodes, edges, and graph-level attributes
//!
//! A `Graph` is an immutable description produced by an external loader.
//! The engine only reads it: nodes are never mutated during a run, and
//! structural queries (start/exit discovery, outgoing edges,
//! reachability) are derived on demand.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// A single step in the workflow graph.
///
/// The `shape` is a visual/semantic marker (`Mdiamond` = start,
/// `Msquare` = exit, others denote a handler family); `node_type` is an
/// explicit override used for handler lookup. The `prompt` is free text
/// interpreted per handler: an LLM instruction, a comma-separated child
/// list, or a condition expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    /// Unique identifier, non-empty within a graph
    pub id: NodeId,
    /// Human-readable label
    pub label: String,
    /// Shape marker used for handler-family resolution
    pub shape: String,
    /// Explicit handler type, overrides shape-based resolution
    pub node_type: String,
    /// Free-text instruction, interpreted per handler
    pub prompt: String,
    /// Extra attempts beyond the first; 0 defers to the graph default
    pub max_retries: u32,
    /// Node must have succeeded before the pipeline may exit
    pub goal_gate: bool,
    /// Redirect target when the retry budget is exhausted
    pub retry_target: String,
    /// Secondary redirect target when `retry_target` is unset
    pub fallback_retry_target: String,
    /// Model-routing fidelity hint
    pub fidelity: String,
    /// Conversation thread routing hint
    pub thread_id: String,
    /// Free-form class marker from the graph definition
    pub node_class: String,
    /// Per-node execution timeout in seconds
    pub timeout: Option<f64>,
    /// Model override for generation nodes
    pub llm_model: String,
    /// Provider override for generation nodes
    pub llm_provider: String,
    /// Reasoning-effort hint for generation nodes
    pub reasoning_effort: String,
    /// Status to assume when an interactive node goes unanswered
    /// (`success`, `partial_success`, `skipped`); empty means fail
    pub auto_status: String,
    /// Accept a partial result when retries are exhausted
    pub allow_partial: bool,
    /// Remaining attributes from the graph definition
    pub attrs: HashMap<String, String>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            id: String::new(),
            label: String::new(),
            shape: "box".to_string(),
            node_type: String::new(),
            prompt: String::new(),
            max_retries: 0,
            goal_gate: false,
            retry_target: String::new(),
            fallback_retry_target: String::new(),
            fidelity: String::new(),
            thread_id: String::new(),
            node_class: String::new(),
            timeout: None,
            llm_model: String::new(),
            llm_provider: String::new(),
            reasoning_effort: "high".to_string(),
            auto_status: String::new(),
            allow_partial: false,
            attrs: HashMap::new(),
        }
    }
}

impl Node {
    /// Create a node with the given id and default attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the shape marker
    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = shape.into();
        self
    }

    /// Set the explicit handler type
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    /// Set the prompt text
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the per-node retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The label if set, otherwise the id
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// A directed transition between two nodes.
///
/// An edge may carry a boolean `condition` expression, a selection
/// `weight`, and a `loop_restart` flag marking it as the back-edge of an
/// intentional cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Edge {
    /// Source node id
    pub from_node: NodeId,
    /// Target node id
    pub to_node: NodeId,
    /// Human-readable label, matched against `preferred_label`
    pub label: String,
    /// Boolean condition expression; empty means unconditional
    pub condition: String,
    /// Selection weight, higher wins among unconditional edges
    pub weight: i64,
    /// Model-routing fidelity hint
    pub fidelity: String,
    /// Conversation thread routing hint
    pub thread_id: String,
    /// Marks the back-edge of an intentional loop
    pub loop_restart: bool,
}

impl Default for Edge {
    fn default() -> Self {
        Self {
            from_node: String::new(),
            to_node: String::new(),
            label: String::new(),
            condition: String::new(),
            weight: 0,
            fidelity: String::new(),
            thread_id: String::new(),
            loop_restart: false,
        }
    }
}

impl Edge {
    /// Create an unconditional edge between two nodes
    pub fn new(from_node: impl Into<String>, to_node: impl Into<String>) -> Self {
        Self {
            from_node: from_node.into(),
            to_node: to_node.into(),
            ..Self::default()
        }
    }

    /// Set the edge label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the condition expression
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Set the selection weight
    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    /// Mark this edge as a loop restart
    pub fn with_loop_restart(mut self) -> Self {
        self.loop_restart = true;
        self
    }
}

/// Candidate ids tried when no node carries the start shape
const START_NAMES: [&str; 2] = ["start", "Start"];

/// Candidate ids tried when no node carries the exit shape
const EXIT_NAMES: [&str; 4] = ["exit", "end", "Exit", "End"];

/// The full workflow graph: nodes, edges, and string attributes.
///
/// Graph-level attributes recognized by the engine are `goal` (mirrored
/// into the context) and `default_max_retry` (string-encoded integer
/// fallback for nodes without an explicit retry count).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name from the definition
    pub name: String,
    /// Edges in declaration order
    pub edges: Vec<Edge>,
    /// Graph-level attributes
    pub attributes: HashMap<String, String>,
    nodes: HashMap<NodeId, Node>,
    node_order: Vec<NodeId>,
}

impl Graph {
    /// Create an empty graph with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Insert a node, preserving insertion order for discovery queries.
    ///
    /// Re-inserting an existing id replaces the node in place.
    pub fn add_node(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.id) {
            self.node_order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    /// Append an edge
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Set a graph-level attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check whether a node id exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The pipeline-level goal string, empty if unset
    pub fn goal(&self) -> &str {
        self.attributes.get("goal").map(String::as_str).unwrap_or("")
    }

    /// Find the start node: first `Mdiamond`-shaped node, else a node
    /// named `start`/`Start`.
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes()
            .find(|n| n.shape == "Mdiamond")
            .or_else(|| START_NAMES.iter().find_map(|name| self.nodes.get(*name)))
    }

    /// Find the exit node: first `Msquare`-shaped node, else a node
    /// named `exit`/`end`/`Exit`/`End`.
    pub fn exit_node(&self) -> Option<&Node> {
        self.nodes()
            .find(|n| n.shape == "Msquare")
            .or_else(|| EXIT_NAMES.iter().find_map(|name| self.nodes.get(*name)))
    }

    /// Whether reaching this node completes the run
    pub fn is_exit(&self, id: &str) -> bool {
        if let Some(node) = self.nodes.get(id) {
            if node.shape == "Msquare" {
                return true;
            }
        }
        self.exit_node().map(|n| n.id == id).unwrap_or(false)
    }

    /// Edges originating from the given node, in declaration order
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.from_node == node_id).collect()
    }

    /// Edges arriving at the given node, in declaration order
    pub fn incoming_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.to_node == node_id).collect()
    }

    /// All node ids reachable from the given node via DFS, including it
    pub fn reachable_from(&self, node_id: &str) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let mut stack = vec![node_id.to_string()];
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            for edge in self.outgoing_edges(&id) {
                stack.push(edge.to_node.clone());
            }
        }
        visited
    }
}
