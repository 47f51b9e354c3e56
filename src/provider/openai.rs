//! OpenAI-compatible Chat Completions client with tool calling.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::{ModelRequestError, ResearchError};
use crate::types::{ContentBlock, ConversationMessage, ToolCallRequest, Usage};

use super::http::{bearer_headers, build_client, status_to_error};
use super::{ModelClient, ModelReply, ModelRequest, ModelResponse, ToolDefinition};

/// Client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiChatClient {
    /// The API key may be omitted only for a non-default (local) endpoint.
    pub fn new(config: ModelConfig) -> Result<Self, ResearchError> {
        if config.api_key.is_none() && !config.is_custom_endpoint() {
            return Err(ResearchError::Configuration(
                "OPENAI_API_KEY is not set (required unless OPENAI_API_BASE points to a local backend)"
                    .into(),
            ));
        }
        let http = build_client(config.request_timeout)?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &ModelRequest<'_>) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_openai).collect();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(tool_to_openai).collect();
            if let Some(obj) = body.as_object_mut() {
                obj.insert("tools".into(), tools.into());
                obj.insert("tool_choice".into(), "auto".into());
            }
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<ModelResponse, ModelRequestError> {
        let resp = self
            .http
            .post(self.endpoint())
            .headers(bearer_headers(self.config.api_key.as_deref()))
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(status_to_error(status, &text));
        }
        parse_response(&text)
    }
}

#[async_trait]
impl ModelClient for OpenAiChatClient {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        request: &ModelRequest<'_>,
    ) -> Result<ModelResponse, ModelRequestError> {
        let body = self.build_request_body(request);
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat completion request"
        );
        self.config
            .retry
            .execute_when(|| self.send(&body), ModelRequestError::is_retryable)
            .await
    }
}

fn parse_response(raw: &str) -> Result<ModelResponse, ModelRequestError> {
    let data: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| ModelRequestError::Malformed(format!("invalid response body: {e}")))?;
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelRequestError::Malformed("no choices in response".into()))?;

    let mut calls: Vec<ToolCallRequest> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest {
            id: tc.id.unwrap_or_default(),
            name: tc.function.name,
            arguments: parse_arguments(tc.function.arguments.as_deref()),
        })
        .collect();
    ToolCallRequest::assign_unique_ids(&mut calls);

    let usage = data
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(ModelResponse {
        reply: ModelReply::from_parts(choice.message.content, calls),
        usage,
    })
}

/// Unparseable arguments are kept as a string so schema validation reports them.
fn parse_arguments(raw: Option<&str>) -> Value {
    match raw.map(str::trim) {
        None | Some("") => json!({}),
        Some(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())),
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn message_to_openai(msg: &ConversationMessage) -> Value {
    match msg {
        ConversationMessage::System { text } => json!({ "role": "system", "content": text }),
        ConversationMessage::User { text } => json!({ "role": "user", "content": text }),
        ConversationMessage::UserMultimodal { blocks } => {
            let parts: Vec<Value> = blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => json!({ "type": "text", "text": text }),
                    ContentBlock::Document(doc) => json!({ "type": "text", "text": doc.render() }),
                    ContentBlock::Image(img) => json!({
                        "type": "image_url",
                        "image_url": { "url": img.data_url() },
                    }),
                })
                .collect();
            json!({ "role": "user", "content": parts })
        }
        ConversationMessage::AssistantText { text } => {
            json!({ "role": "assistant", "content": text })
        }
        ConversationMessage::AssistantToolCalls { calls } => {
            let tool_calls: Vec<Value> = calls
                .iter()
                .map(|tc| {
                    let arguments = match &tc.arguments {
                        Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": { "name": tc.name, "arguments": arguments },
                    })
                })
                .collect();
            json!({ "role": "assistant", "content": Value::Null, "tool_calls": tool_calls })
        }
        ConversationMessage::ToolResult(result) => json!({
            "role": "tool",
            "tool_call_id": result.tool_call_id,
            "content": result.content,
        }),
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentText, ImageContent, MediaKind, ToolResult};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_key_against_default_endpoint_is_rejected() {
        let err = OpenAiChatClient::new(ModelConfig::default()).unwrap_err();
        assert!(matches!(err, ResearchError::Configuration(_)));
    }

    #[test]
    fn missing_key_against_local_endpoint_is_allowed() {
        let config = ModelConfig::builder()
            .base_url("http://localhost:11434/v1")
            .build();
        assert!(OpenAiChatClient::new(config).is_ok());
    }

    #[test]
    fn tool_call_message_has_null_content_and_string_arguments() {
        let msg = ConversationMessage::tool_calls(vec![ToolCallRequest {
            id: "call_1".into(),
            name: "web_search".into(),
            arguments: json!({ "query": "rust" }),
        }]);
        let value = message_to_openai(&msg);
        assert_eq!(value["content"], Value::Null);
        assert_eq!(value["tool_calls"][0]["function"]["arguments"], r#"{"query":"rust"}"#);
    }

    #[test]
    fn tool_result_maps_to_tool_role() {
        let msg = ConversationMessage::tool_result(ToolResult::error("call_9", "boom"));
        assert_eq!(
            message_to_openai(&msg),
            json!({ "role": "tool", "tool_call_id": "call_9", "content": "boom" })
        );
    }

    #[test]
    fn multimodal_blocks_become_parts() {
        let msg = ConversationMessage::user_blocks(vec![
            ContentBlock::Text {
                text: "Summarize".into(),
            },
            ContentBlock::Document(DocumentText {
                source: "notes.txt".into(),
                kind: MediaKind::Text,
                text: "hello".into(),
                truncated: false,
            }),
            ContentBlock::Image(ImageContent {
                data: "AAAA".into(),
                mime_type: "image/png".into(),
                source: "a.png".into(),
            }),
        ]);
        let value = message_to_openai(&msg);
        assert_eq!(value["content"][1]["text"], "[File: notes.txt]\n\nhello");
        assert_eq!(
            value["content"][2]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn malformed_arguments_are_kept_as_string() {
        assert_eq!(parse_arguments(Some("{oops")), Value::String("{oops".into()));
        assert_eq!(parse_arguments(Some("  ")), json!({}));
        assert_eq!(parse_arguments(None), json!({}));
    }

    #[test]
    fn response_without_choices_is_malformed() {
        let err = parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ModelRequestError::Malformed(_)));
    }

    #[test]
    fn missing_tool_call_id_is_generated() {
        let raw = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"type":"function","function":{"name":"web_search","arguments":"{\"query\":\"x\"}"}}
        ]}}]}"#;
        let response = parse_response(raw).unwrap();
        match response.reply {
            ModelReply::ToolCalls { calls, .. } => {
                assert!(calls[0].id.starts_with("call_"));
                assert_eq!(calls[0].arguments, json!({ "query": "x" }));
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn repeated_tool_call_id_gets_a_fresh_one() {
        let raw = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"dup","type":"function","function":{"name":"echo","arguments":"{\"text\":\"a\"}"}},
            {"id":"dup","type":"function","function":{"name":"echo","arguments":"{\"text\":\"b\"}"}}
        ]}}]}"#;
        let response = parse_response(raw).unwrap();
        match response.reply {
            ModelReply::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].id, "dup");
                assert_ne!(calls[1].id, "dup");
                assert!(calls[1].id.starts_with("call_"));
                assert_eq!(calls[1].arguments, json!({ "text": "b" }));
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }
}
