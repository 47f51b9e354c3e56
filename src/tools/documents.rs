//! `load_document` and `summarize_document`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ResearchError;
use crate::input::detect_attachment;
use crate::provider::{ModelReply, ModelRequest};
use crate::types::{ConversationMessage, MediaKind};
use crate::util::text::truncate_chars;

use super::builtin::ToolContext;
use super::tool::{FnTool, Tool, ToolCallContext};
use super::types::AgentToolParameters;

pub const LOAD_DOCUMENT: &str = "load_document";
pub const SUMMARIZE_DOCUMENT: &str = "summarize_document";

/// Upper bound on text handed back to the model from one load.
const MAX_LOADED_CHARS: usize = 100_000;
/// Text shorter than this (after trimming) is returned as its own summary.
const MIN_SUMMARIZE_CHARS: usize = 100;
/// Only the head of very long documents is sent for summarization.
const MAX_SUMMARIZE_INPUT_CHARS: usize = 12_000;
const DEFAULT_SUMMARY_CHARS: usize = 1500;

/// Create the `load_document` tool: extracts text from a PDF or text file.
///
/// Images are not decoded; the model is told to rely on its vision input instead.
pub fn load_document_tool(ctx: &ToolContext) -> Arc<dyn Tool> {
    let extractor = ctx.extractor.clone();
    FnTool::shared(
        LOAD_DOCUMENT,
        "Load and extract text from a document file. Supports PDF, text, and image paths \
         (images return a note to use vision).",
        AgentToolParameters::object()
            .string("path", "Absolute or relative path to the file.", true)
            .build(),
        move |args, _ctx: ToolCallContext| {
            let extractor = extractor.clone();
            async move {
                let path = PathBuf::from(args.get_str("path")?);
                let attachment = detect_attachment(&path)
                    .map_err(|e| ResearchError::tool(LOAD_DOCUMENT, e.to_string()))?;

                if attachment.kind == MediaKind::Image {
                    return Ok(format!(
                        "[Image file: {}. Use the assistant's vision capability to analyze this image.]",
                        attachment.file_name()
                    ));
                }

                let kind = attachment.kind;
                let text = tokio::task::spawn_blocking(move || extractor.extract_text(&path, kind))
                    .await
                    .map_err(|e| ResearchError::tool(LOAD_DOCUMENT, e.to_string()))?
                    .map_err(|e| ResearchError::tool(LOAD_DOCUMENT, e.to_string()))?;

                let (kept, truncated) = truncate_chars(&text, MAX_LOADED_CHARS);
                if truncated {
                    Ok(format!("{kept}\n\n[... document truncated]"))
                } else {
                    Ok(text)
                }
            }
        },
    )
}

/// Create the `summarize_document` tool: one tool-less model request per call.
pub fn summarize_document_tool(ctx: &ToolContext) -> Arc<dyn Tool> {
    let model = ctx.model.clone();
    FnTool::shared(
        SUMMARIZE_DOCUMENT,
        "Summarize long document text concisely, preserving key facts.",
        AgentToolParameters::object()
            .string("text", "The document text to summarize.", true)
            .integer_with_default(
                "max_length",
                "Max summary length in characters.",
                DEFAULT_SUMMARY_CHARS as i64,
            )
            .build(),
        move |args, _ctx: ToolCallContext| {
            let model = model.clone();
            async move {
                let text = args.get_str("text")?;
                let max_length = args.get_usize_or("max_length", DEFAULT_SUMMARY_CHARS)?;
                if text.trim().chars().count() < MIN_SUMMARIZE_CHARS {
                    return Ok(text.to_string());
                }

                let messages = [ConversationMessage::user(summary_prompt(text, max_length))];
                let response = model
                    .complete(&ModelRequest::new(&messages, &[]))
                    .await
                    .map_err(|e| ResearchError::tool(SUMMARIZE_DOCUMENT, e.to_string()))?;

                match response.reply {
                    ModelReply::Final { text } => Ok(text),
                    ModelReply::ToolCalls { discarded_text, .. } => {
                        discarded_text.ok_or_else(|| {
                            ResearchError::tool(
                                SUMMARIZE_DOCUMENT,
                                "model requested tools instead of summarizing",
                            )
                        })
                    }
                }
            }
        },
    )
}

fn summary_prompt(text: &str, max_length: usize) -> String {
    let (head, _) = truncate_chars(text, MAX_SUMMARIZE_INPUT_CHARS);
    format!(
        "Summarize the following document concisely, preserving key facts and conclusions. \
         Keep the summary under {max_length} characters.\n\n---\n\n{head}"
    )
}
