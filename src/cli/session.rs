//! One-off, interactive, and indexing command handlers.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::agent_loop::{AgentEvent, AgentLoop, EventSink};
use crate::config::AgentConfig;
use crate::error::{ResearchError, Result};
use crate::index::KnowledgeBase;
use crate::input::{DocumentExtractor, FsDocumentExtractor, InputNormalizer};
use crate::provider::{ModelClient, OpenAiChatClient};
use crate::tools::{research_registry, ToolContext};
use crate::util::text::preview;

const BANNER: &str = "Multi-modal Research Agent (interactive). Type 'quit' or 'exit' to stop.\n";
const QUERY_PROMPT: &str = "You: ";
const FILES_PROMPT: &str = "Files (comma-separated paths, or Enter to skip): ";

/// Wire the OpenAI-compatible client, built-in tools and normalizer into an agent.
pub fn build_agent(config: &AgentConfig) -> Result<AgentLoop> {
    let model: Arc<dyn ModelClient> = Arc::new(OpenAiChatClient::new(config.model.clone())?);
    build_agent_with(config, model, Arc::new(FsDocumentExtractor))
}

/// Same as [`build_agent`] with caller-supplied collaborators.
pub fn build_agent_with(
    config: &AgentConfig,
    model: Arc<dyn ModelClient>,
    extractor: Arc<dyn DocumentExtractor>,
) -> Result<AgentLoop> {
    let ctx = ToolContext::new(
        model.clone(),
        extractor.clone(),
        config.tools.clone(),
        config.index_dir.clone(),
    )?;
    let registry = Arc::new(research_registry(&ctx)?);
    let normalizer = InputNormalizer::new(extractor, config.agent.max_attachment_chars);
    Ok(AgentLoop::new(model, registry, normalizer, config.agent.clone()))
}

/// Tool progress on stderr so stdout carries only answers.
pub fn progress_sink() -> EventSink {
    Arc::new(|event: AgentEvent| match event {
        AgentEvent::ToolCallStarted { call, .. } => {
            eprintln!("→ {} ({})", call.name, call.id);
        }
        AgentEvent::ToolCallFinished {
            tool_name, result, ..
        } if result.is_error => {
            eprintln!("  ✗ {tool_name}: {}", preview(&result.content, 200));
        }
        _ => {}
    })
}

/// Answer one query and print the answer. When the iteration limit is hit, whatever the
/// agent produced last is printed before the error is returned.
pub async fn run_once<W: Write>(
    agent: &AgentLoop,
    query: &str,
    files: &[PathBuf],
    out: &mut W,
) -> Result<()> {
    match agent.run(query, files).await {
        Ok(outcome) => writeln!(out, "{}", outcome.answer.trim())?,
        Err(e) => {
            if let Some(partial) = e.partial_output() {
                writeln!(out, "{}", partial.trim())?;
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Prompt for queries until EOF or `quit`/`exit`/`q`. Per-turn errors are reported and the
/// session continues.
pub async fn run_interactive<R, W>(agent: &AgentLoop, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    writeln!(out, "{BANNER}")?;

    loop {
        write!(out, "{QUERY_PROMPT}")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() || matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        let query = query.to_string();

        write!(out, "{FILES_PROMPT}")?;
        out.flush()?;
        let files = lines
            .next_line()
            .await?
            .map(|raw| parse_file_list(&raw))
            .unwrap_or_default();

        match agent.run(&query, &files).await {
            Ok(outcome) => writeln!(out, "\nAgent: {}\n", outcome.answer.trim())?,
            Err(e) => {
                tracing::debug!(error = ?e, "turn failed");
                writeln!(out, "\nError: {e}\n")?;
                if let Some(partial) = e.partial_output() {
                    writeln!(out, "Last output:\n{}\n", partial.trim())?;
                }
            }
        }
    }
    Ok(())
}

/// Split a comma-separated path list, ignoring blanks.
pub fn parse_file_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Index the targets and print one summary line per target.
pub async fn run_index<W: Write>(
    config: &AgentConfig,
    targets: Vec<PathBuf>,
    recursive: bool,
    out: &mut W,
) -> Result<()> {
    let kb = KnowledgeBase::new(config.index_dir.clone(), Arc::new(FsDocumentExtractor));
    let reports = tokio::task::spawn_blocking(move || kb.index_paths(&targets, recursive))
        .await
        .map_err(|e| ResearchError::Index(format!("indexing task failed: {e}")))??;
    for report in &reports {
        writeln!(out, "{report}")?;
    }
    Ok(())
}
