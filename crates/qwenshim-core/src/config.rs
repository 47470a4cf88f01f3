use std::time::Duration;

use crate::models::DEFAULT_QWEN_MODEL;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

pub const ENV_API_KEY: &str = "DASHSCOPE_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "QWEN_API_KEY";
pub const ENV_BASE_URL: &str = "QWEN_BASE_URL";
pub const ENV_MODEL: &str = "QWEN_MODEL";
pub const ENV_PROXY: &str = "QWEN_PROXY";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Caps the whole exchange, streamed body included. Stalled streams are cut by
/// the idle timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(86400);
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required generator config field: {0}")]
    MissingField(&'static str),
    #[error("failed to build upstream client: {0}")]
    Client(String),
}

/// Final configuration of one generator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub api_key: String,
    /// OpenAI-compatible root, without the `/chat/completions` suffix.
    pub base_url: String,
    pub default_model: String,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Longest silence tolerated between two body chunks.
    pub stream_idle_timeout: Duration,
}

impl GeneratorConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        GeneratorConfigPatch {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
        .into_config()
    }

    /// Defaults, overlaid by the environment, overlaid by `explicit`.
    pub fn from_env_with(explicit: GeneratorConfigPatch) -> Result<Self, ConfigError> {
        let mut merged = GeneratorConfigPatch::from_env();
        merged.overlay(explicit);
        merged.into_config()
    }
}

/// Optional layer used for merging generator config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorConfigPatch {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub proxy: Option<String>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub stream_idle_timeout: Option<Duration>,
}

impl GeneratorConfigPatch {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the known variables through `lookup`. Blank values and
    /// unresolved `${VAR}` placeholders count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| sanitize_optional_env_value(lookup(key));
        Self {
            api_key: read(ENV_API_KEY).or_else(|| read(ENV_API_KEY_FALLBACK)),
            base_url: read(ENV_BASE_URL),
            default_model: read(ENV_MODEL),
            proxy: read(ENV_PROXY),
            ..Default::default()
        }
    }

    pub fn overlay(&mut self, other: GeneratorConfigPatch) {
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.default_model.is_some() {
            self.default_model = other.default_model;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.connect_timeout.is_some() {
            self.connect_timeout = other.connect_timeout;
        }
        if other.request_timeout.is_some() {
            self.request_timeout = other.request_timeout;
        }
        if other.stream_idle_timeout.is_some() {
            self.stream_idle_timeout = other.stream_idle_timeout;
        }
    }

    pub fn into_config(self) -> Result<GeneratorConfig, ConfigError> {
        let api_key = sanitize_optional_env_value(self.api_key)
            .ok_or(ConfigError::MissingField("api_key"))?;
        let base_url = sanitize_optional_env_value(self.base_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(GeneratorConfig {
            api_key,
            base_url,
            default_model: sanitize_optional_env_value(self.default_model)
                .unwrap_or_else(|| DEFAULT_QWEN_MODEL.to_string()),
            proxy: sanitize_optional_env_value(self.proxy),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            stream_idle_timeout: self
                .stream_idle_timeout
                .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT),
        })
    }
}

impl From<GeneratorConfig> for GeneratorConfigPatch {
    fn from(value: GeneratorConfig) -> Self {
        Self {
            api_key: Some(value.api_key),
            base_url: Some(value.base_url),
            default_model: Some(value.default_model),
            proxy: value.proxy,
            connect_timeout: Some(value.connect_timeout),
            request_timeout: Some(value.request_timeout),
            stream_idle_timeout: Some(value.stream_idle_timeout),
        }
    }
}

fn sanitize_optional_env_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}
