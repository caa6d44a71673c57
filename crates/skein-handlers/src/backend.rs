//! Generation backend abstraction
//!
//! Generate nodes delegate the actual model call to a
//! [`GenerationBackend`]. Hosts plug in a real provider client; tests
//! and dry runs use [`StubBackend`], which echoes a deterministic
//! response.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a generation backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The provider rejected or failed the request
    #[error("generation failed: {0}")]
    Failed(String),

    /// The request timed out
    #[error("generation timed out after {0} seconds")]
    Timeout(f64),
}

/// One generation request, assembled from a node's fields and the
/// context at execution time
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// The full prompt text
    pub prompt: String,
    /// Context snapshot taken when the request was built, so the
    /// backend can compose context-dependent prompts
    pub snapshot: HashMap<String, Value>,
    /// Model override, empty for the backend's default
    pub model: String,
    /// Provider override, empty for the backend's default
    pub provider: String,
    /// Model-routing fidelity hint from the node
    pub fidelity: String,
    /// Requested reasoning effort
    pub reasoning_effort: String,
    /// Wall-clock bound in seconds, if any
    pub timeout: Option<f64>,
}

/// Produces model completions for generate nodes
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one generation request to completion
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

/// Deterministic echo backend for tests and dry runs
#[derive(Debug, Default)]
pub struct StubBackend;

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let head: String = request.prompt.chars().take(50).collect();
        Ok(format!("stub response: {head}"))
    }
}
