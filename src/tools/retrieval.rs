//! `retrieve_from_knowledge_base` over the local index.

use std::sync::Arc;

use crate::error::ResearchError;
use crate::index::SearchHit;

use super::builtin::ToolContext;
use super::tool::{FnTool, Tool, ToolCallContext};
use super::types::AgentToolParameters;

pub const RETRIEVE_FROM_KNOWLEDGE_BASE: &str = "retrieve_from_knowledge_base";

const DEFAULT_RESULTS: usize = 5;

pub const EMPTY_KNOWLEDGE_BASE_TEXT: &str =
    "The knowledge base is empty. Index documents first with: research-agent index <path_or_dir>";

/// Create the `retrieve_from_knowledge_base` tool.
pub fn retrieve_from_knowledge_base_tool(ctx: &ToolContext) -> Arc<dyn Tool> {
    let kb = ctx.knowledge_base.clone();
    FnTool::shared(
        RETRIEVE_FROM_KNOWLEDGE_BASE,
        "Search the pre-indexed knowledge base for passages relevant to the query. Use when the \
         user has added documents to the knowledge base and you need relevant context.",
        AgentToolParameters::object()
            .string("query", "What to look for.", true)
            .integer_with_default(
                "n_results",
                "Number of passages to return.",
                DEFAULT_RESULTS as i64,
            )
            .build(),
        move |args, _ctx: ToolCallContext| {
            let kb = kb.clone();
            async move {
                let query = args.get_str("query")?.to_string();
                let n = args.get_usize_or("n_results", DEFAULT_RESULTS)?.max(1);
                let hits = tokio::task::spawn_blocking(move || kb.search(&query, n))
                    .await
                    .map_err(|e| ResearchError::tool(RETRIEVE_FROM_KNOWLEDGE_BASE, e.to_string()))?
                    .map_err(|e| {
                        ResearchError::tool(RETRIEVE_FROM_KNOWLEDGE_BASE, format!("Retrieval error: {e}"))
                    })?;
                Ok(format_hits(&hits))
            }
        },
    )
}

pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return EMPTY_KNOWLEDGE_BASE_TEXT.to_string();
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] (from {})\n{}", i + 1, hit.source, hit.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
