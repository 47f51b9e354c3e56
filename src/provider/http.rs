//! HTTP client construction, auth headers, and status mapping.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{ModelRequestError, ResearchError};

/// Build a client with the given request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ResearchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .user_agent(concat!("research-agent/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ResearchError::Configuration(format!("cannot build HTTP client: {e}")))
}

/// JSON headers, with a Bearer token when a key is configured.
pub fn bearer_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
        if let Ok(val) = HeaderValue::from_str(&format!("Bearer {key}")) {
            headers.insert(AUTHORIZATION, val);
        }
    }
    headers
}

/// Map a non-success HTTP status to a model request error.
pub fn status_to_error(status: u16, body: &str) -> ModelRequestError {
    match status {
        401 | 403 => ModelRequestError::Authentication(error_message(body)),
        429 => ModelRequestError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ModelRequestError::Api {
            status,
            message: error_message(body),
        },
    }
}

/// Prefer `error.message` from an OpenAI-style error body; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_sends_no_authorization_header() {
        let headers = bearer_headers(None);
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn openai_error_body_message_is_extracted() {
        let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
        match status_to_error(401, body) {
            ModelRequestError::Authentication(msg) => assert_eq!(msg, "Invalid API key"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rate_limit_reads_retry_after() {
        let body = r#"{"error":{"message":"slow down","retry_after":1.5}}"#;
        assert!(matches!(
            status_to_error(429, body),
            ModelRequestError::RateLimited {
                retry_after_ms: Some(1500)
            }
        ));
    }
}
