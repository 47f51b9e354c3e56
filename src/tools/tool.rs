//! The `Tool` seam and a closure-backed implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::{AgentToolParameters, ToolDefinition};
use crate::error::ResearchError;

/// Which call a tool is serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallContext {
    pub call_id: String,
    pub tool_name: String,
}

/// A named, schema-described action the model can ask for.
///
/// `invoke` only ever sees arguments that passed schema validation. Failures are
/// turned into error results by the registry and never reach the caller.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema, as advertised to the model.
    fn definition(&self) -> &ToolDefinition;

    fn name(&self) -> &str {
        &self.definition().name
    }

    async fn invoke(
        &self,
        args: &ToolArguments,
        ctx: &ToolCallContext,
    ) -> Result<String, ResearchError>;
}

type BoxedHandler = dyn Fn(ToolArguments, ToolCallContext) -> Pin<Box<dyn Future<Output = Result<String, ResearchError>> + Send>>
    + Send
    + Sync;

/// A tool whose behavior is an async closure.
#[derive(Clone)]
pub struct FnTool {
    definition: ToolDefinition,
    handler: Arc<BoxedHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolCallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ResearchError>> + Send + 'static,
    {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: description.into(),
                parameters: parameters.schema,
            },
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// Shorthand for `Arc::new(FnTool::new(..))` as a trait object.
    pub fn shared<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Arc<dyn Tool>
    where
        F: Fn(ToolArguments, ToolCallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ResearchError>> + Send + 'static,
    {
        Arc::new(Self::new(name, description, parameters, handler))
    }
}

#[async_trait]
impl Tool for FnTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(
        &self,
        args: &ToolArguments,
        ctx: &ToolCallContext,
    ) -> Result<String, ResearchError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}
