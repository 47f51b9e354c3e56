//! Built-in research tools.
//!
//! Provides `load_document`, `summarize_document`, `web_search`,
//! `search_academic_papers` and `retrieve_from_knowledge_base`. Each tool is
//! constructed via [`FnTool::shared`](crate::tools::FnTool::shared) over a
//! shared [`ToolContext`] and returned as `Arc<dyn Tool>`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ToolSettings;
use crate::error::Result;
use crate::index::KnowledgeBase;
use crate::input::DocumentExtractor;
use crate::provider::http::build_client;
use crate::provider::ModelClient;
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::Tool;

use super::{academic, documents, retrieval, web};

/// Collaborators the built-in tools need, passed in explicitly at construction.
#[derive(Clone)]
pub struct ToolContext {
    pub model: Arc<dyn ModelClient>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub knowledge_base: KnowledgeBase,
    pub http: reqwest::Client,
    pub settings: ToolSettings,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("model", &self.model.model_id())
            .field("knowledge_base", &self.knowledge_base)
            .field("settings", &self.settings)
            .finish()
    }
}

impl ToolContext {
    pub fn new(
        model: Arc<dyn ModelClient>,
        extractor: Arc<dyn DocumentExtractor>,
        settings: ToolSettings,
        index_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let http = build_client(settings.http_timeout)?;
        let knowledge_base = KnowledgeBase::new(index_dir, extractor.clone());
        Ok(Self {
            model,
            extractor,
            knowledge_base,
            http,
            settings,
        })
    }
}

/// Every built-in tool, in the order they are advertised to the model.
pub fn research_tools(ctx: &ToolContext) -> Vec<Arc<dyn Tool>> {
    vec![
        documents::load_document_tool(ctx),
        documents::summarize_document_tool(ctx),
        web::web_search_tool(ctx),
        academic::search_academic_papers_tool(ctx),
        retrieval::retrieve_from_knowledge_base_tool(ctx),
    ]
}

/// A registry holding every built-in tool with the configured tool retry policy.
pub fn research_registry(ctx: &ToolContext) -> Result<ToolRegistry> {
    Ok(ToolRegistry::from_tools(research_tools(ctx))?.with_retry(ctx.settings.retry.clone()))
}
