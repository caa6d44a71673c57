//! Registry setup for host applications
//!
//! Hosts call [`default_registry`] at startup to get a
//! `HandlerRegistry` with every built-in handler wired to the host's
//! backend, interviewer, and tool table. Omitted options fall back to
//! headless defaults (stub generation, auto-approval, empty tools), so
//! a bare `default_registry(RegistryOptions::default())` is enough for
//! a dry run.

use std::sync::Arc;

use crate::backend::{GenerationBackend, StubBackend};
use crate::control::{ConditionalHandler, FanInHandler, ParallelHandler, StackLoopHandler};
use crate::input::WaitHumanHandler;
use crate::interviewer::{AutoApproveInterviewer, Interviewer};
use crate::lifecycle::{ExitHandler, StartHandler};
use crate::processing::{GenerateHandler, ToolHandler};
use crate::tools::ToolTable;
use skein_engine::HandlerRegistry;

/// Pluggable pieces for the built-in handlers
#[derive(Default)]
pub struct RegistryOptions {
    /// Generation backend; `StubBackend` when absent
    pub backend: Option<Arc<dyn GenerationBackend>>,
    /// Interviewer for human-interaction nodes; auto-approve when
    /// absent
    pub interviewer: Option<Arc<dyn Interviewer>>,
    /// Host tool table; empty when absent
    pub tools: Option<Arc<ToolTable>>,
}

/// Build a registry with all built-in handlers registered.
///
/// The generate handler doubles as the default, so nodes with an
/// unrecognized shape and no explicit type still execute as generation
/// stages.
pub fn default_registry(options: RegistryOptions) -> Arc<HandlerRegistry> {
    let backend = options
        .backend
        .unwrap_or_else(|| Arc::new(StubBackend));
    let interviewer = options
        .interviewer
        .unwrap_or_else(|| Arc::new(AutoApproveInterviewer));
    let tools = options.tools.unwrap_or_default();

    let registry = Arc::new(HandlerRegistry::new());
    registry.register("start", Arc::new(StartHandler));
    registry.register("exit", Arc::new(ExitHandler));
    registry.register("generate", Arc::new(GenerateHandler::new(Arc::clone(&backend))));
    registry.register("conditional", Arc::new(ConditionalHandler));
    registry.register("wait.human", Arc::new(WaitHumanHandler::new(interviewer)));
    registry.register("tool", Arc::new(ToolHandler::new(tools)));

    // These resolve their children back through the registry; the weak
    // reference breaks the cycle
    registry.register(
        "parallel",
        Arc::new(ParallelHandler::new(Arc::downgrade(&registry))),
    );
    registry.register(
        "parallel.fan_in",
        Arc::new(FanInHandler),
    );
    registry.register(
        "stack.loop",
        Arc::new(StackLoopHandler::new(Arc::downgrade(&registry))),
    );

    registry.set_default(Arc::new(GenerateHandler::new(backend)));
    registry
}
