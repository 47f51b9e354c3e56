//! Core run types for the agent loop.

use strum::Display;
use uuid::Uuid;

use crate::types::{Conversation, ToolCallRequest, Usage};

/// Unique run identifier.
pub type RunId = Uuid;

/// Where the loop is between model turns.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum LoopState {
    /// Next step is a model request over the current conversation.
    AwaitingModel,
    /// The model asked for these calls; each gets exactly one result.
    Dispatching(Vec<ToolCallRequest>),
    /// The model answered without tool calls.
    Done(String),
    /// The iteration limit was reached first.
    Failed,
}

/// Result of a run that reached `Done`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// Final model text, exactly as returned.
    pub answer: String,
    pub conversation: Conversation,
    /// Completed dispatch phases.
    pub iterations: usize,
    pub usage: Usage,
}
