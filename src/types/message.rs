//! Conversation history as a tagged union of message kinds.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::attachment::MediaKind;

/// A message in a conversation. Each kind carries exactly the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationMessage {
    System { text: String },
    User { text: String },
    UserMultimodal { blocks: Vec<ContentBlock> },
    AssistantText { text: String },
    AssistantToolCalls { calls: Vec<ToolCallRequest> },
    ToolResult(ToolResult),
}

impl ConversationMessage {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::System { text: text.into() }
    }

    /// Create a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Create a user message from content blocks. A single text block collapses to plain text.
    pub fn user_blocks(mut blocks: Vec<ContentBlock>) -> Self {
        if blocks.len() == 1 {
            if let ContentBlock::Text { .. } = blocks[0] {
                if let Some(ContentBlock::Text { text }) = blocks.pop() {
                    return Self::User { text };
                }
            }
        }
        Self::UserMultimodal { blocks }
    }

    /// Create an assistant text message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::AssistantText { text: text.into() }
    }

    /// Create an assistant message requesting tool calls.
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self::AssistantToolCalls { calls }
    }

    /// Create a tool result message.
    pub fn tool_result(result: ToolResult) -> Self {
        Self::ToolResult(result)
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } | Self::UserMultimodal { .. } => Role::User,
            Self::AssistantText { .. } | Self::AssistantToolCalls { .. } => Role::Assistant,
            Self::ToolResult(_) => Role::Tool,
        }
    }

    /// Extract the text content, concatenating text-bearing blocks.
    pub fn text(&self) -> String {
        match self {
            Self::System { text } | Self::User { text } | Self::AssistantText { text } => {
                text.clone()
            }
            Self::UserMultimodal { blocks } => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.clone()),
                    ContentBlock::Document(doc) => Some(doc.render()),
                    ContentBlock::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::AssistantToolCalls { .. } => String::new(),
            Self::ToolResult(result) => result.content.clone(),
        }
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single unit of user content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image(ImageContent),
    Document(DocumentText),
}

/// Image content embedded in a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageContent {
    /// Base64-encoded bytes.
    pub data: String,
    pub mime_type: String,
    pub source: String,
}

impl ImageContent {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Text extracted from an attached document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentText {
    /// File name the text came from.
    pub source: String,
    pub kind: MediaKind,
    pub text: String,
    #[serde(default)]
    pub truncated: bool,
}

impl DocumentText {
    pub fn label(&self) -> String {
        match self.kind {
            MediaKind::Pdf => format!("[PDF: {}]", self.source),
            _ => format!("[File: {}]", self.source),
        }
    }

    /// Text as presented to the model, prefixed with its source label.
    pub fn render(&self) -> String {
        let mut rendered = format!("{}\n\n{}", self.label(), self.text);
        if self.truncated {
            rendered.push_str("\n\n[... document truncated]");
        }
        rendered
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    /// Replace empty ids and repeats of an earlier id in the same turn with fresh ones,
    /// so every result can be matched to exactly one call.
    pub fn assign_unique_ids(calls: &mut [ToolCallRequest]) {
        let mut seen = HashSet::with_capacity(calls.len());
        for call in calls.iter_mut() {
            if call.id.is_empty() || !seen.insert(call.id.clone()) {
                call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                seen.insert(call.id.clone());
            }
        }
    }
}

/// The outcome of one tool call, matched to its request by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// Append-only message history. Messages are never reordered or edited.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// All tool results, in conversation order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.messages.iter().filter_map(|m| match m {
            ConversationMessage::ToolResult(result) => Some(result),
            _ => None,
        })
    }

    pub fn into_messages(self) -> Vec<ConversationMessage> {
        self.messages
    }
}
