//! Generate node handler
//!
//! Sends the node's prompt to the configured [`GenerationBackend`] and
//! stores the response under `{node_id}.response`. Prompt and response
//! are also written to the node's log directory for post-run
//! inspection.
//!
//! Backend failures become `Outcome::fail(...)`, so the engine charges
//! them against the node's retry budget.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{GenerationBackend, GenerationRequest};
use skein_engine::{Handler, Result};
use skein_model::{Context, Graph, Node, Outcome};

/// Handler for model-generation nodes
pub struct GenerateHandler {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerateHandler {
    /// Create a generate handler over the given backend
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    fn request_for(node: &Node, context: &Context) -> GenerationRequest {
        let prompt = if node.prompt.is_empty() {
            node.display_name().to_string()
        } else {
            node.prompt.clone()
        };
        GenerationRequest {
            prompt,
            snapshot: context.snapshot(),
            model: node.llm_model.clone(),
            provider: node.llm_provider.clone(),
            fidelity: node.fidelity.clone(),
            reasoning_effort: node.reasoning_effort.clone(),
            timeout: node.timeout,
        }
    }
}

#[async_trait]
impl Handler for GenerateHandler {
    async fn execute(
        &self,
        node: &Node,
        context: &Arc<Context>,
        _graph: &Arc<Graph>,
        logs_dir: &Path,
    ) -> Result<Outcome> {
        let request = Self::request_for(node, context);

        if let Err(err) = tokio::fs::write(logs_dir.join("prompt.txt"), &request.prompt).await {
            log::warn!("could not write prompt log for '{}': {err}", node.id);
        }

        log::debug!(
            "generate '{}': model='{}' provider='{}' effort='{}'",
            node.id,
            request.model,
            request.provider,
            request.reasoning_effort
        );

        match self.backend.generate(&request).await {
            Ok(response) => {
                if let Err(err) =
                    tokio::fs::write(logs_dir.join("response.txt"), &response).await
                {
                    log::warn!("could not write response log for '{}': {err}", node.id);
                }
                Ok(Outcome::success().with_update(format!("{}.response", node.id), response))
            }
            Err(err) => {
                log::warn!("generate '{}' failed: {err}", node.id);
                Ok(Outcome::fail(err.to_string()))
            }
        }
    }
}
