//! Name-keyed tool registry with schema validation and failure capture.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolCallContext};
use super::types::ToolDefinition;
use super::validation::validate_arguments;
use crate::error::{ResearchError, Result};
use crate::types::{ToolCallRequest, ToolResult};
use crate::util::retry::RetryPolicy;
use crate::util::text::preview;

/// Fixed set of tools, exposed identically on every model turn.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("retry", &self.retry)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry policy applied to handler failures. Argument errors are never retried.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ResearchError::Configuration(format!(
                "tool '{name}' is already registered"
            )));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Build a registry from a list of tools.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and run one call, surfacing tool-level errors.
    pub async fn invoke(&self, call: &ToolCallRequest) -> Result<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ResearchError::UnknownTool(call.name.clone()))?;

        validate_arguments(&call.arguments, &tool.definition().parameters).map_err(|message| {
            ResearchError::ToolArgument {
                tool: call.name.clone(),
                message,
            }
        })?;

        let args = ToolArguments::for_tool(&call.name, call.arguments.clone());
        let ctx = ToolCallContext {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
        };

        self.retry
            .execute_when(
                || {
                    let fut = tool.invoke(&args, &ctx);
                    let name = call.name.clone();
                    async move {
                        match AssertUnwindSafe(fut).catch_unwind().await {
                            Ok(result) => result,
                            Err(panic) => Err(ResearchError::tool(
                                name,
                                format!("handler panicked: {}", panic_message(panic.as_ref())),
                            )),
                        }
                    }
                },
                |e: &ResearchError| matches!(e, ResearchError::ToolInvocation { .. }),
            )
            .await
    }

    /// Resolve one call into exactly one result. Never fails.
    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolResult {
        debug!(tool = %call.name, id = %call.id, "dispatching tool call");
        match self.invoke(call).await {
            Ok(content) => {
                debug!(tool = %call.name, output = %preview(&content, 120), "tool call succeeded");
                ToolResult::success(&call.id, content)
            }
            Err(e) => {
                if e.is_tool_level() {
                    warn!(tool = %call.name, id = %call.id, error = %e, "tool call failed");
                } else {
                    error!(tool = %call.name, id = %call.id, error = %e, "tool call failed outside the tool");
                }
                ToolResult::error(&call.id, e.to_string())
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
