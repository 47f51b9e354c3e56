//! Configuration, layered: defaults < TOML file < environment < CLI flags.
//!
//! Built once at process start and passed by value into the model client, the
//! tools, and the agent loop. Nothing here is global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::error::{ResearchError, Result};
use crate::util::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_MAX_ATTACHMENT_CHARS: usize = 100_000;
pub const DEFAULT_WEB_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
pub const DEFAULT_SEMANTIC_SCHOLAR_URL: &str = "https://api.semanticscholar.org/graph/v1";
pub const DEFAULT_ARXIV_URL: &str = "http://export.arxiv.org/api/query";

const APP_NAME: &str = "research-agent";

/// Connection settings for the chat-completion backend.
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct ModelConfig {
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    /// Optional for local backends.
    #[builder(into)]
    pub api_key: Option<String>,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(default = Duration::from_secs(120))]
    pub request_timeout: Duration,
    #[builder(default)]
    pub retry: RetryPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ModelConfig {
    /// Whether the base URL points somewhere other than the hosted default.
    pub fn is_custom_endpoint(&self) -> bool {
        self.base_url.trim_end_matches('/') != DEFAULT_BASE_URL
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct AgentSettings {
    #[builder(default = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    #[builder(into)]
    pub system_prompt: Option<String>,
    #[builder(default = DEFAULT_MAX_ATTACHMENT_CHARS)]
    pub max_attachment_chars: usize,
    #[builder(default = true)]
    pub parallel_tool_calls: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Settings shared by the built-in tools.
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct ToolSettings {
    #[builder(default)]
    pub retry: RetryPolicy,
    #[builder(into, default = DEFAULT_WEB_SEARCH_URL.to_string())]
    pub web_search_url: String,
    #[builder(into, default = DEFAULT_SEMANTIC_SCHOLAR_URL.to_string())]
    pub semantic_scholar_url: String,
    #[builder(into, default = DEFAULT_ARXIV_URL.to_string())]
    pub arxiv_url: String,
    #[builder(default = Duration::from_secs(15))]
    pub http_timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentConfig {
    pub model: ModelConfig,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
    /// Directory holding the persisted vector index.
    pub index_dir: PathBuf,
}

impl AgentConfig {
    /// Defaults only, with the platform index directory.
    pub fn defaults() -> Self {
        Self {
            index_dir: default_index_dir(),
            ..Default::default()
        }
    }

    /// Load configuration: defaults, then the TOML file, then `.env` and the environment.
    ///
    /// An explicit `config_path` must exist; the default location is optional. The result is
    /// not validated, so callers can apply command-line overrides before [`Self::validate`].
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::defaults();

        match config_path {
            Some(path) => config.apply_file(&FileConfig::read(path)?),
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    config.apply_file(&FileConfig::read(&path)?);
                }
            }
        }

        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a parsed config file.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(model) = &file.model {
            if let Some(v) = &model.base_url {
                self.model.base_url = v.clone();
            }
            if let Some(v) = &model.api_key {
                self.model.api_key = Some(v.clone());
            }
            if let Some(v) = &model.model {
                self.model.model = v.clone();
            }
            if let Some(v) = model.max_attempts {
                self.model.retry = self.model.retry.clone().with_max_attempts(v);
            }
            if let Some(v) = model.timeout_secs {
                self.model.request_timeout = Duration::from_secs(v);
            }
        }
        if let Some(agent) = &file.agent {
            if let Some(v) = agent.max_iterations {
                self.agent.max_iterations = v;
            }
            if let Some(v) = &agent.system_prompt {
                self.agent.system_prompt = Some(v.clone());
            }
            if let Some(v) = agent.max_attachment_chars {
                self.agent.max_attachment_chars = v;
            }
            if let Some(v) = agent.parallel_tool_calls {
                self.agent.parallel_tool_calls = v;
            }
        }
        if let Some(tools) = &file.tools {
            if let Some(v) = tools.max_attempts {
                self.tools.retry = self.tools.retry.clone().with_max_attempts(v);
            }
            if let Some(v) = &tools.web_search_url {
                self.tools.web_search_url = v.clone();
            }
            if let Some(v) = &tools.semantic_scholar_url {
                self.tools.semantic_scholar_url = v.clone();
            }
            if let Some(v) = &tools.arxiv_url {
                self.tools.arxiv_url = v.clone();
            }
        }
        if let Some(index) = &file.index {
            if let Some(v) = &index.dir {
                self.index_dir = v.clone();
            }
        }
    }

    /// Overlay values from environment variables, looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_API_BASE").or_else(|| get("OPENAI_BASE_URL")) {
            self.model.base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.model.model = model;
        }
        if let Some(v) = get("MAX_AGENT_STEPS") {
            self.agent.max_iterations = parse_env("MAX_AGENT_STEPS", &v)?;
        }
        if let Some(v) = get("RESEARCH_MODEL_MAX_ATTEMPTS") {
            let attempts = parse_env("RESEARCH_MODEL_MAX_ATTEMPTS", &v)?;
            self.model.retry = self.model.retry.clone().with_max_attempts(attempts);
        }
        if let Some(v) = get("RESEARCH_TOOL_MAX_ATTEMPTS") {
            let attempts = parse_env("RESEARCH_TOOL_MAX_ATTEMPTS", &v)?;
            self.tools.retry = self.tools.retry.clone().with_max_attempts(attempts);
        }
        if let Some(v) = get("RESEARCH_MAX_ATTACHMENT_CHARS") {
            self.agent.max_attachment_chars = parse_env("RESEARCH_MAX_ATTACHMENT_CHARS", &v)?;
        }
        if let Some(v) = get("RESEARCH_PARALLEL_TOOLS") {
            self.agent.parallel_tool_calls = parse_env("RESEARCH_PARALLEL_TOOLS", &v)?;
        }
        if let Some(dir) = get("RESEARCH_INDEX_DIR") {
            self.index_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(ResearchError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(ResearchError::Configuration("model id is empty".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ResearchError::Configuration(format!("invalid value for {key}: '{value}'"))
    })
}

/// `<user data dir>/research-agent/index`, falling back to `./data/index`.
pub fn default_index_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("data").join("index"))
}

/// `<user config dir>/research-agent/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// On-disk TOML layout. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<ModelSection>,
    pub agent: Option<AgentSection>,
    pub tools: Option<ToolsSection>,
    pub index: Option<IndexSection>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    pub max_iterations: Option<usize>,
    pub system_prompt: Option<String>,
    pub max_attachment_chars: Option<usize>,
    pub parallel_tool_calls: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    pub max_attempts: Option<u32>,
    pub web_search_url: Option<String>,
    pub semantic_scholar_url: Option<String>,
    pub arxiv_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    pub dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| ResearchError::Configuration(format!("invalid config file: {e}")))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ResearchError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::defaults();
        assert_eq!(config.model.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model.model, "gpt-4o");
        assert!(config.model.api_key.is_none());
        assert_eq!(config.model.retry.max_attempts, 1);
        assert_eq!(config.tools.retry.max_attempts, 1);
        assert_eq!(config.agent.max_iterations, 10);
        assert!(config.agent.parallel_tool_calls);
    }

    #[test]
    fn env_overrides_model_settings() {
        let mut config = AgentConfig::defaults();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_API_BASE", "http://localhost:11434/v1"),
                ("OPENAI_MODEL", "llama3"),
                ("MAX_AGENT_STEPS", "4"),
                ("RESEARCH_MODEL_MAX_ATTEMPTS", "3"),
            ]))
            .unwrap();

        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model.model, "llama3");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.model.retry.max_attempts, 3);
        assert!(config.model.is_custom_endpoint());
    }

    #[test]
    fn base_url_alias_is_accepted() {
        let mut config = AgentConfig::defaults();
        config
            .apply_env(env(&[("OPENAI_BASE_URL", "http://127.0.0.1:1234/v1")]))
            .unwrap();
        assert_eq!(config.model.base_url, "http://127.0.0.1:1234/v1");
    }

    #[test]
    fn invalid_numeric_env_is_a_configuration_error() {
        let mut config = AgentConfig::defaults();
        let err = config
            .apply_env(env(&[("MAX_AGENT_STEPS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ResearchError::Configuration(_)));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AgentConfig::defaults();
        config.apply_env(env(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(config.model.api_key.is_none());
    }

    #[test]
    fn zero_iterations_fails_validation() {
        let mut config = AgentConfig::defaults();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_apply_below_env() {
        let file = FileConfig::parse(
            r#"
            [model]
            model = "gpt-4o-mini"
            max_attempts = 2

            [agent]
            max_iterations = 6
            parallel_tool_calls = false

            [index]
            dir = "/tmp/kb"
            "#,
        )
        .unwrap();

        let mut config = AgentConfig::defaults();
        config.apply_file(&file);
        config.apply_env(env(&[("OPENAI_MODEL", "gpt-4.1")])).unwrap();

        assert_eq!(config.model.model, "gpt-4.1");
        assert_eq!(config.model.retry.max_attempts, 2);
        assert_eq!(config.agent.max_iterations, 6);
        assert!(!config.agent.parallel_tool_calls);
        assert_eq!(config.index_dir, PathBuf::from("/tmp/kb"));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(FileConfig::parse("[model]\ntemperature = 0.2\n").is_err());
    }
}
