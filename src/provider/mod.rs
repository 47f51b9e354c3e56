//! Model client seam and the OpenAI-compatible chat-completions adapter.

pub mod http;
pub mod openai;

use async_trait::async_trait;

use crate::error::ModelRequestError;
use crate::types::{ConversationMessage, ToolCallRequest, Usage};

pub use crate::tools::ToolDefinition;
pub use openai::OpenAiChatClient;

/// One round-trip's worth of input: the full conversation plus every tool schema.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [ConversationMessage],
    pub tools: &'a [ToolDefinition],
}

impl<'a> ModelRequest<'a> {
    pub fn new(messages: &'a [ConversationMessage], tools: &'a [ToolDefinition]) -> Self {
        Self { messages, tools }
    }
}

/// What the model decided to do this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final {
        text: String,
    },
    ToolCalls {
        calls: Vec<ToolCallRequest>,
        /// Text that came back alongside the calls. Never shown to the user.
        discarded_text: Option<String>,
    },
}

impl ModelReply {
    /// Tool calls take priority over any text returned in the same turn.
    pub fn from_parts(text: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        if calls.is_empty() {
            Self::Final {
                text: text.unwrap_or_default(),
            }
        } else {
            Self::ToolCalls {
                calls,
                discarded_text: text.filter(|t| !t.trim().is_empty()),
            }
        }
    }
}

/// A parsed model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub reply: ModelReply,
    pub usage: Usage,
}

/// Chat-completion backend able to request tool calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier, for logs.
    fn model_id(&self) -> &str;

    async fn complete(
        &self,
        request: &ModelRequest<'_>,
    ) -> Result<ModelResponse, ModelRequestError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_calls_win_over_text() {
        let call = ToolCallRequest {
            id: "c1".into(),
            name: "web_search".into(),
            arguments: json!({ "query": "rust" }),
        };
        let reply = ModelReply::from_parts(Some("Let me check.".into()), vec![call.clone()]);
        assert_eq!(
            reply,
            ModelReply::ToolCalls {
                calls: vec![call],
                discarded_text: Some("Let me check.".into()),
            }
        );
    }

    #[test]
    fn missing_text_without_calls_is_empty_final() {
        assert_eq!(
            ModelReply::from_parts(None, vec![]),
            ModelReply::Final {
                text: String::new()
            }
        );
    }
}
