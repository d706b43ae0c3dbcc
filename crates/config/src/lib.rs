//! Configuration loading, validation, and management for Heatline.
//!
//! Loads configuration from `heatline.toml` with environment variable
//! overrides for secrets. Validates all settings at startup; everything
//! is read-only once the server is up.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure. Maps directly to `heatline.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// The business this deployment answers for
    #[serde(default)]
    pub company: CompanyConfig,

    /// Completion backend configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Knowledge retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Tool dispatch configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Turn audit configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Canned answer texts for the degrade paths
    #[serde(default)]
    pub answers: AnswerConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("company", &self.company)
            .field("completion", &self.completion)
            .field("retrieval", &self.retrieval)
            .field("tools", &self.tools)
            .field("audit", &self.audit)
            .field("gateway", &self.gateway)
            .field("answers", &self.answers)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// Business name, used in the assistant persona
    #[serde(default = "default_company_name")]
    pub name: String,

    /// The human-contact phone line referenced by fallback answers
    #[serde(default = "default_contact_phone")]
    pub contact_phone: String,
}

fn default_company_name() -> String {
    "Comfort Heating & Air".into()
}
fn default_contact_phone() -> String {
    "(555) 987-6643".into()
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            contact_phone: default_contact_phone(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible completion API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key; the `HEATLINE_API_KEY` env var overrides this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output length in tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Completion round-trip budget in seconds
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    1024
}
fn default_completion_timeout() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Backend: "memory", "vector", or "none"
    #[serde(default = "default_retrieval_backend")]
    pub backend: String,

    /// Minimum relevance score for a snippet to be included
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum snippets returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Retrieval round-trip budget in seconds
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,

    /// Vector-search service endpoint (backend = "vector")
    #[serde(default)]
    pub search_url: String,

    /// Embeddings endpoint base URL (backend = "vector")
    #[serde(default = "default_api_url")]
    pub embeddings_url: String,

    /// Embedding model identifier (backend = "vector")
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_retrieval_backend() -> String {
    "memory".into()
}
fn default_threshold() -> f32 {
    0.5
}
fn default_top_k() -> usize {
    5
}
fn default_retrieval_timeout() -> u64 {
    5
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_retrieval_backend(),
            threshold: default_threshold(),
            top_k: default_top_k(),
            timeout_secs: default_retrieval_timeout(),
            search_url: String::new(),
            embeddings_url: default_api_url(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Per-handler execution budget in seconds
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

fn default_tool_timeout() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Sink: "jsonl", "memory", or "none"
    #[serde(default = "default_audit_sink")]
    pub sink: String,

    /// JSONL file path (sink = "jsonl")
    #[serde(default = "default_audit_path")]
    pub path: String,
}

fn default_audit_sink() -> String {
    "jsonl".into()
}
fn default_audit_path() -> String {
    "turns.jsonl".into()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: default_audit_sink(),
            path: default_audit_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Accepted bearer tokens; empty means the endpoint is open
    #[serde(default)]
    pub bearer_tokens: Vec<String>,

    /// CORS origins allowed on the chat route; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8090
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_tokens: Vec::new(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Returned whenever the model consultation fails or times out
    #[serde(default = "default_fallback_apology")]
    pub fallback_apology: String,

    /// Returned for an empty user message, without consulting the model
    #[serde(default = "default_solicitation")]
    pub solicitation: String,

    /// Replaces the built-in persona preamble when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_fallback_apology() -> String {
    "I apologize, but I'm having trouble right now. Please call (555) 987-6643 for immediate assistance.".into()
}
fn default_solicitation() -> String {
    "How can I help? Tell me what's going on with your system and I'll point you in the right direction.".into()
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            fallback_apology: default_fallback_apology(),
            solicitation: default_solicitation(),
            system_prompt_override: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from the given path if it exists, otherwise defaults
    /// (still applying env overrides).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    /// Environment variables override file values for secrets.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("HEATLINE_API_KEY") {
            if !key.is_empty() {
                self.completion.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("HEATLINE_API_URL") {
            if !url.is_empty() {
                self.completion.api_url = url;
            }
        }
        if let Ok(url) = std::env::var("HEATLINE_SEARCH_URL") {
            if !url.is_empty() {
                self.retrieval.search_url = url;
            }
        }
    }

    /// Validate settings that would otherwise fail deep inside a turn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be in [0.0, 2.0], got {}",
                self.completion.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(ConfigError::Invalid(format!(
                "retrieval.threshold must be in [0.0, 1.0], got {}",
                self.retrieval.threshold
            )));
        }
        if !matches!(self.retrieval.backend.as_str(), "memory" | "vector" | "none") {
            return Err(ConfigError::Invalid(format!(
                "retrieval.backend must be memory|vector|none, got '{}'",
                self.retrieval.backend
            )));
        }
        if self.retrieval.backend == "vector" && self.retrieval.search_url.is_empty() {
            return Err(ConfigError::Invalid(
                "retrieval.backend = \"vector\" requires retrieval.search_url".into(),
            ));
        }
        if !matches!(self.audit.sink.as_str(), "jsonl" | "memory" | "none") {
            return Err(ConfigError::Invalid(format!(
                "audit.sink must be jsonl|memory|none, got '{}'",
                self.audit.sink
            )));
        }
        if self.answers.fallback_apology.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "answers.fallback_apology must not be empty".into(),
            ));
        }
        if self.answers.solicitation.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "answers.solicitation must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.backend, "memory");
        assert!(config.answers.fallback_apology.contains("(555) 987-6643"));
    }

    #[test]
    fn load_from_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("heatline.toml");
        std::fs::write(
            &path,
            r#"
[company]
name = "Polar Air Services"
contact_phone = "(555) 111-2222"

[completion]
model = "gpt-4o"
temperature = 0.1

[gateway]
port = 9100
bearer_tokens = ["secret-token"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.company.name, "Polar Air Services");
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.gateway.bearer_tokens, vec!["secret-token"]);
        // Unspecified sections keep defaults
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            completion: CompletionConfig {
                temperature: 7.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn vector_backend_requires_search_url() {
        let config = AppConfig {
            retrieval: RetrievalConfig {
                backend: "vector".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let config = AppConfig {
            retrieval: RetrievalConfig {
                backend: "pinecone".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            completion: CompletionConfig {
                api_key: Some("sk-super-secret".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default(Path::new("/nonexistent/heatline.toml")).unwrap();
        assert_eq!(config.gateway.port, 8090);
    }
}
