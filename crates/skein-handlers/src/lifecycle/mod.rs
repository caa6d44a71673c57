//! Lifecycle handlers
//!
//! Entry and exit nodes for a pipeline run.

mod exit;
mod start;

pub use exit::ExitHandler;
pub use start::StartHandler;
