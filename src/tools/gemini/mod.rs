//! MCP tools exposing the consultation orchestrator.

pub mod format;
pub mod tool_router;

pub use tool_router::{GeminiRouter, GeminiSvc};
