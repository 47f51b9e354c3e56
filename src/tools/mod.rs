//! Tool system for function calling.

pub mod academic;
pub mod arguments;
pub mod builtin;
pub mod documents;
pub mod registry;
pub mod retrieval;
pub mod tool;
pub mod types;
pub mod validation;
pub mod web;

pub use arguments::ToolArguments;
pub use builtin::{research_registry, research_tools, ToolContext};
pub use registry::ToolRegistry;
pub use tool::{FnTool, Tool, ToolCallContext};
pub use types::{AgentToolParameters, ToolDefinition};
pub use validation::validate_arguments;
