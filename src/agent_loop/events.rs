//! Progress events emitted while a run advances.

use std::sync::Arc;

use serde::Serialize;

use crate::types::{ToolCallRequest, ToolResult};

use super::types::RunId;

/// High-level events for observers such as the CLI progress display.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    RunStarted {
        run_id: RunId,
    },
    ModelRequest {
        run_id: RunId,
        /// 1-based model turn.
        turn: usize,
    },
    ToolCallStarted {
        run_id: RunId,
        call: ToolCallRequest,
    },
    ToolCallFinished {
        run_id: RunId,
        tool_name: String,
        result: ToolResult,
    },
    Completed {
        run_id: RunId,
        iterations: usize,
    },
    Failed {
        run_id: RunId,
        error: String,
    },
}

/// Callback receiving [`AgentEvent`]s. Must not block.
pub type EventSink = Arc<dyn Fn(AgentEvent) + Send + Sync>;
