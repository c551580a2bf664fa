//! Tool calling: handlers, the registry, and the multi-round orchestrator.

pub mod handler;
pub mod orchestrator;
pub mod registry;

pub use handler::{handler_fn, parameters_schema, Tool, ToolHandler};
pub use orchestrator::{ToolCallOrchestrator, DEFAULT_MAX_ROUNDS};
pub use registry::ToolRegistry;
