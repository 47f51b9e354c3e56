//! Shared test helpers: a scripted model client and agent builders.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use research_agent::agent_loop::AgentLoop;
use research_agent::config::AgentSettings;
use research_agent::error::{ModelRequestError, ResearchError};
use research_agent::input::{DocumentExtractor, FsDocumentExtractor, InputNormalizer};
use research_agent::provider::{ModelClient, ModelReply, ModelRequest, ModelResponse};
use research_agent::tools::{AgentToolParameters, FnTool, Tool, ToolRegistry};
use research_agent::types::{ConversationMessage, MediaKind, ToolCallRequest, Usage};

/// A model client that replays queued replies and records every request.
///
/// Requests that carry no tools (e.g. from `summarize_document`) are answered
/// from a separate side channel so they do not consume the main script.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelReply, ModelRequestError>>>,
    fallback: Mutex<ModelReply>,
    side_reply: Mutex<String>,
    requests: Mutex<Vec<Vec<ConversationMessage>>>,
    side_requests: Mutex<Vec<Vec<ConversationMessage>>>,
    tool_names: Mutex<Vec<Vec<String>>>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(ModelReply::Final {
                text: "Mock response".into(),
            }),
            side_reply: Mutex::new("Mock summary".into()),
            requests: Mutex::new(Vec::new()),
            side_requests: Mutex::new(Vec::new()),
            tool_names: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a final text reply.
    pub fn queue_text(&self, text: &str) {
        self.script.lock().unwrap().push_back(Ok(ModelReply::Final {
            text: text.to_string(),
        }));
    }

    /// Queue a turn requesting the given `(id, name, arguments)` calls.
    pub fn queue_tool_calls(&self, calls: &[(&str, &str, serde_json::Value)]) {
        self.queue_reply(ModelReply::ToolCalls {
            calls: calls.iter().map(|(id, name, args)| call(id, name, args.clone())).collect(),
            discarded_text: None,
        });
    }

    pub fn queue_reply(&self, reply: ModelReply) {
        self.script.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: ModelRequestError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Reply used once the script is exhausted.
    pub fn set_fallback(&self, reply: ModelReply) {
        *self.fallback.lock().unwrap() = reply;
    }

    pub fn set_side_reply(&self, text: &str) {
        *self.side_reply.lock().unwrap() = text.to_string();
    }

    /// Requests made with tools attached (agent-loop turns).
    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests made without tools.
    pub fn side_requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.side_requests.lock().unwrap().clone()
    }

    /// Tool names advertised on each agent-loop turn.
    pub fn advertised_tools(&self) -> Vec<Vec<String>> {
        self.tool_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &ModelRequest<'_>,
    ) -> Result<ModelResponse, ModelRequestError> {
        let usage = Usage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        };
        if request.tools.is_empty() {
            self.side_requests
                .lock()
                .unwrap()
                .push(request.messages.to_vec());
            return Ok(ModelResponse {
                reply: ModelReply::Final {
                    text: self.side_reply.lock().unwrap().clone(),
                },
                usage,
            });
        }

        self.requests.lock().unwrap().push(request.messages.to_vec());
        self.tool_names
            .lock()
            .unwrap()
            .push(request.tools.iter().map(|t| t.name.clone()).collect());

        let next = self.script.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => reply?,
            None => self.fallback.lock().unwrap().clone(),
        };
        Ok(ModelResponse { reply, usage })
    }
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// Extractor that returns canned text for PDFs and reads text files from disk.
pub struct StubPdfExtractor {
    pub pdf_text: String,
}

impl DocumentExtractor for StubPdfExtractor {
    fn extract_text(&self, path: &Path, kind: MediaKind) -> Result<String, ResearchError> {
        match kind {
            MediaKind::Pdf => Ok(self.pdf_text.clone()),
            other => FsDocumentExtractor.extract_text(path, other),
        }
    }
}

pub fn settings(max_iterations: usize) -> AgentSettings {
    AgentSettings::builder().max_iterations(max_iterations).build()
}

/// An agent over `tools` with the filesystem extractor.
pub fn agent_with_tools(
    model: Arc<ScriptedModel>,
    tools: Vec<Arc<dyn Tool>>,
    settings: AgentSettings,
) -> AgentLoop {
    let registry = Arc::new(ToolRegistry::from_tools(tools).unwrap());
    let normalizer = InputNormalizer::new(
        Arc::new(FsDocumentExtractor),
        settings.max_attachment_chars,
    );
    AgentLoop::new(model, registry, normalizer, settings)
}

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// `echo` tool: returns `echo: <text>`.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "echo",
        "Echo the text back",
        AgentToolParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        |args, _ctx| async move { Ok(format!("echo: {}", args.get_str("text")?)) },
    ))
}
