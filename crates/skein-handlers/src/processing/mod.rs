//! Processing handlers
//!
//! Nodes that produce new data: model generation and host tool calls.

mod generate;
mod tool_exec;

pub use generate::GenerateHandler;
pub use tool_exec::ToolHandler;
