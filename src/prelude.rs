//! Convenience re-exports.

pub use crate::agent_loop::{AgentEvent, AgentLoop, EventSink, LoopState, RunOutcome};
pub use crate::config::{AgentConfig, AgentSettings, ModelConfig, ToolSettings};
pub use crate::error::{ErrorCategory, InputError, ModelRequestError, ResearchError, Result};
pub use crate::index::KnowledgeBase;
pub use crate::input::{DocumentExtractor, FsDocumentExtractor, InputNormalizer};
pub use crate::provider::{ModelClient, ModelReply, ModelRequest, ModelResponse, OpenAiChatClient};
pub use crate::tools::{
    AgentToolParameters, FnTool, Tool, ToolArguments, ToolCallContext, ToolDefinition,
    ToolRegistry,
};
pub use crate::types::{
    Attachment, ContentBlock, Conversation, ConversationMessage, MediaKind, Role,
    ToolCallRequest, ToolResult, Usage,
};
pub use crate::util::retry::RetryPolicy;
