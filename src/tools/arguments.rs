//! Typed access to a tool call's JSON arguments.

use std::str::FromStr;

use serde_json::Value;

use crate::error::ResearchError;

/// Arguments of one tool call, tagged with the tool name for error messages.
///
/// An explicit `null` is treated the same as an absent key.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    tool: String,
    value: Value,
}

impl ToolArguments {
    pub fn for_tool(tool: impl Into<String>, value: Value) -> Self {
        Self {
            tool: tool.into(),
            value,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.value
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.value.get(key).filter(|v| !v.is_null())
    }

    fn invalid(&self, message: String) -> ResearchError {
        ResearchError::ToolArgument {
            tool: self.tool.clone(),
            message,
        }
    }

    /// A required string.
    pub fn get_str(&self, key: &str) -> Result<&str, ResearchError> {
        self.field(key)
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid(format!("missing string argument '{key}'")))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// A required integer.
    pub fn get_i64(&self, key: &str) -> Result<i64, ResearchError> {
        self.field(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.invalid(format!("missing integer argument '{key}'")))
    }

    /// An optional count; `default` when absent.
    pub fn get_usize_or(&self, key: &str, default: usize) -> Result<usize, ResearchError> {
        match self.field(key) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| self.invalid(format!("'{key}' must be a non-negative integer, got {v}"))),
        }
    }

    /// An optional string parsed into `T` (typically a strum enum).
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ResearchError> {
        self.get_str_opt(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| self.invalid(format!("unrecognized value '{raw}' for '{key}'")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArguments {
        ToolArguments::for_tool("web_search", value)
    }

    #[test]
    fn null_counts_as_absent() {
        let a = args(json!({ "query": "rust", "max_results": null }));
        assert_eq!(a.get_usize_or("max_results", 5).unwrap(), 5);
        assert_eq!(a.get_str("query").unwrap(), "rust");
    }

    #[test]
    fn negative_count_is_rejected_with_tool_name() {
        let err = args(json!({ "max_results": -1 }))
            .get_usize_or("max_results", 5)
            .unwrap_err();
        match err {
            ResearchError::ToolArgument { tool, message } => {
                assert_eq!(tool, "web_search");
                assert!(message.contains("max_results"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parsed_values_use_from_str() {
        let a = args(json!({ "n": "42", "bad": "x" }));
        assert_eq!(a.get_parsed::<u8>("n").unwrap(), Some(42));
        assert_eq!(a.get_parsed::<u8>("absent").unwrap(), None);
        assert!(a.get_parsed::<u8>("bad").is_err());
    }
}
