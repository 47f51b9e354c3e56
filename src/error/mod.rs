//! Error types for the research agent.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for all research-agent operations.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Invalid arguments for tool '{tool}': {message}")]
    ToolArgument { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution error: {tool} - {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("Model request failed: {0}")]
    ModelRequest(#[from] ModelRequestError),

    #[error("Agent stopped after {max_iterations} iterations without a final answer")]
    LoopLimitExceeded {
        max_iterations: usize,
        /// Content of the last conversation message, if any.
        last_output: Option<String>,
    },

    #[error("Could not extract text from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResearchError {
    /// Shorthand for a handler failure inside a named tool.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input(_) => ErrorCategory::Input,
            Self::ToolArgument { .. } | Self::UnknownTool(_) => ErrorCategory::ToolArgument,
            Self::ToolInvocation { .. } => ErrorCategory::ToolExecution,
            Self::ModelRequest(e) => e.category(),
            Self::LoopLimitExceeded { .. } => ErrorCategory::LoopLimit,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Extraction { .. } | Self::Index(_) | Self::Io(_) => ErrorCategory::Storage,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ModelRequest(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Tool-level errors are absorbed into the conversation as error results.
    pub fn is_tool_level(&self) -> bool {
        matches!(
            self,
            Self::ToolArgument { .. } | Self::UnknownTool(_) | Self::ToolInvocation { .. }
        )
    }

    /// Text the agent produced before stopping at the iteration limit.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::LoopLimitExceeded { last_output, .. } => last_output.as_deref(),
            _ => None,
        }
    }
}

/// A bad attachment, detected before any model call.
#[derive(Error, Debug)]
#[error("Input error for {}: {reason}", path.display())]
pub struct InputError {
    pub path: PathBuf,
    pub reason: InputErrorReason,
}

impl InputError {
    pub fn new(path: impl Into<PathBuf>, reason: InputErrorReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

/// Why an attachment was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputErrorReason {
    #[error("file not found")]
    NotFound,

    #[error("unsupported file type '{extension}'")]
    Unsupported { extension: String },

    #[error("could not read file: {0}")]
    Unreadable(String),
}

/// Backend failure talking to the chat-completion endpoint. Fatal to the current query.
#[derive(Error, Debug)]
pub enum ModelRequestError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ModelRequestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) => ErrorCategory::Network,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Malformed(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server
        )
    }
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    ToolArgument,
    ToolExecution,
    Authentication,
    RateLimit,
    Network,
    Server,
    Api,
    LoopLimit,
    Configuration,
    Serialization,
    Storage,
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = ModelRequestError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        let client = ModelRequestError::Api {
            status: 400,
            message: "bad request".into(),
        };

        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert_eq!(client.category(), ErrorCategory::Api);
    }

    #[test]
    fn api_401_is_classified_as_authentication() {
        let err = ModelRequestError::Api {
            status: 401,
            message: "nope".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert!(!err.is_retryable());
    }

    #[test]
    fn tool_level_errors_are_flagged() {
        assert!(ResearchError::tool("web_search", "boom").is_tool_level());
        assert!(ResearchError::UnknownTool("x".into()).is_tool_level());
        assert!(!ResearchError::Configuration("x".into()).is_tool_level());
    }

    #[test]
    fn only_loop_limit_carries_partial_output() {
        let err = ResearchError::LoopLimitExceeded {
            max_iterations: 2,
            last_output: Some("echo: draft".into()),
        };
        assert_eq!(err.partial_output(), Some("echo: draft"));
        assert_eq!(ResearchError::tool("echo", "boom").partial_output(), None);
    }

    #[test]
    fn input_error_message_names_the_file() {
        let err = InputError::new(
            "notes.xyz",
            InputErrorReason::Unsupported {
                extension: "xyz".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "Input error for notes.xyz: unsupported file type 'xyz'"
        );
    }
}
