//! The agent loop runner.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AgentSettings;
use crate::error::{ResearchError, Result};
use crate::input::InputNormalizer;
use crate::provider::{ModelClient, ModelReply, ModelRequest};
use crate::tools::ToolRegistry;
use crate::types::{Conversation, ConversationMessage, ToolCallRequest, ToolResult, Usage};
use crate::util::text::preview;

use super::events::{AgentEvent, EventSink};
use super::types::{LoopState, RunId, RunOutcome};

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a multi-modal research assistant. You can:
- Answer questions using your knowledge.
- Load and analyze documents (PDF, text, images) when the user provides file paths or asks about files.
- Summarize long documents.
- Search the web for current information when needed.
- Search academic papers on Semantic Scholar and arXiv.
- Retrieve passages from the user's indexed knowledge base.

Use tools when they would improve your answer. Cite sources when you use web_search, academic search, or document content. If the user attaches images or PDFs, analyze them and respond accordingly. Be concise but thorough.";

/// Drives one conversation from the user's turn to a final answer.
///
/// Exactly one model request is in flight at a time. Tool calls from one
/// turn may run concurrently, but their results are appended in request order
/// before the next model request.
#[derive(Clone)]
pub struct AgentLoop {
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    normalizer: InputNormalizer,
    settings: AgentSettings,
    event_sink: Option<EventSink>,
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("model", &self.model.model_id())
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        normalizer: InputNormalizer,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            registry,
            normalizer,
            settings,
            event_sink: None,
        }
    }

    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer `query` with optional attachments.
    ///
    /// Attachments are normalized before anything else; a bad file fails with
    /// [`ResearchError::Input`] and no model request is made.
    pub async fn run(&self, query: &str, attachments: &[PathBuf]) -> Result<RunOutcome> {
        let normalizer = self.normalizer.clone();
        let (owned_query, paths) = (query.to_string(), attachments.to_vec());
        // Extraction reads whole files and parses PDFs; keep it off the async workers.
        let blocks = tokio::task::spawn_blocking(move || normalizer.normalize(&owned_query, &paths))
            .await
            .map_err(std::io::Error::other)??;

        let mut conversation = Conversation::new();
        let system = self
            .settings
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        conversation.push(ConversationMessage::system(system));
        conversation.push(ConversationMessage::user_blocks(blocks));

        self.run_conversation(conversation).await
    }

    /// Advance an already-built conversation until `Done` or `Failed`.
    pub async fn run_conversation(&self, conversation: Conversation) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("agent_run", run_id = %run_id, model = %self.model.model_id());
        self.drive(run_id, conversation).instrument(span).await
    }

    async fn drive(&self, run_id: RunId, mut conversation: Conversation) -> Result<RunOutcome> {
        let max_iterations = self.settings.max_iterations;
        let definitions = self.registry.definitions();
        let mut iterations = 0usize;
        let mut turns = 0usize;
        let mut usage = Usage::default();
        let mut state = LoopState::AwaitingModel;

        self.emit(AgentEvent::RunStarted { run_id });

        loop {
            debug!(state = %state, iterations, "loop state");
            state = match state {
                LoopState::AwaitingModel if iterations >= max_iterations => LoopState::Failed,
                LoopState::AwaitingModel => {
                    turns += 1;
                    self.emit(AgentEvent::ModelRequest { run_id, turn: turns });
                    let request = ModelRequest::new(conversation.messages(), &definitions);
                    let response = match self.model.complete(&request).await {
                        Ok(response) => response,
                        Err(e) => {
                            let err = ResearchError::from(e);
                            self.emit(AgentEvent::Failed {
                                run_id,
                                error: err.to_string(),
                            });
                            return Err(err);
                        }
                    };
                    usage.merge(&response.usage);
                    match response.reply {
                        ModelReply::Final { text } => LoopState::Done(text),
                        ModelReply::ToolCalls {
                            calls,
                            discarded_text,
                        } => {
                            if let Some(text) = discarded_text {
                                debug!(text = %preview(&text, 120), "discarding text sent with tool calls");
                            }
                            LoopState::Dispatching(calls)
                        }
                    }
                }
                LoopState::Dispatching(mut calls) => {
                    ToolCallRequest::assign_unique_ids(&mut calls);
                    conversation.push(ConversationMessage::tool_calls(calls.clone()));
                    let results = self.dispatch_all(run_id, &calls).await;
                    debug_assert_eq!(results.len(), calls.len());
                    for result in results {
                        conversation.push(ConversationMessage::tool_result(result));
                    }
                    iterations += 1;
                    LoopState::AwaitingModel
                }
                LoopState::Done(answer) => {
                    conversation.push(ConversationMessage::assistant(answer.clone()));
                    self.emit(AgentEvent::Completed { run_id, iterations });
                    debug!(iterations, turns, "run completed");
                    return Ok(RunOutcome {
                        run_id,
                        answer,
                        conversation,
                        iterations,
                        usage,
                    });
                }
                LoopState::Failed => {
                    let last_output = conversation
                        .last()
                        .map(ConversationMessage::text)
                        .filter(|text| !text.trim().is_empty());
                    let err = ResearchError::LoopLimitExceeded {
                        max_iterations,
                        last_output,
                    };
                    warn!(max_iterations, "iteration limit reached without a final answer");
                    self.emit(AgentEvent::Failed {
                        run_id,
                        error: err.to_string(),
                    });
                    return Err(err);
                }
            };
        }
    }

    /// Resolve every call into exactly one result, in request order.
    async fn dispatch_all(&self, run_id: RunId, calls: &[ToolCallRequest]) -> Vec<ToolResult> {
        if self.settings.parallel_tool_calls && calls.len() > 1 {
            join_all(calls.iter().map(|call| self.dispatch_one(run_id, call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.dispatch_one(run_id, call).await);
            }
            results
        }
    }

    async fn dispatch_one(&self, run_id: RunId, call: &ToolCallRequest) -> ToolResult {
        self.emit(AgentEvent::ToolCallStarted {
            run_id,
            call: call.clone(),
        });
        let result = self.registry.dispatch(call).await;
        self.emit(AgentEvent::ToolCallFinished {
            run_id,
            tool_name: call.name.clone(),
            result: result.clone(),
        });
        result
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(sink) = &self.event_sink {
            sink(event);
        }
    }
}
