use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ANSWER_PROMPT: &str = "You are a helpful AI assistant in a real-time meeting context. Answer questions concisely and naturally. Provide your answer in both English and Chinese (Simplified), separated by '---SEPARATOR---'. Format: English answer first, then the separator, then Chinese answer.";

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:3000";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Settings for one live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL serving `/api/translate`, `/api/answer` and `/api/transcribe`.
    pub service_url: String,
    /// Trailing-edge debounce for interim enrichment.
    pub debounce_ms: u64,
    /// Forced engine restart cadence while listening.
    pub refresh_interval_secs: u64,
    /// Finalized segments sent as context with an interim answer request.
    pub interim_history_limit: usize,
    pub request_timeout_secs: u64,
    pub answer_prompt: String,
    pub language: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            debounce_ms: 600,
            refresh_interval_secs: 5 * 60,
            interim_history_limit: 5,
            request_timeout_secs: 30,
            answer_prompt: DEFAULT_ANSWER_PROMPT.to_string(),
            language: "en-US".to_string(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `MEETLINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = read_var("MEETLINE_SERVICE_URL") {
            config.service_url = url;
        }
        if let Some(ms) = parse_var("MEETLINE_DEBOUNCE_MS")? {
            config.debounce_ms = ms;
        }
        if let Some(secs) = parse_var("MEETLINE_REFRESH_SECS")? {
            config.refresh_interval_secs = secs;
        }
        if let Some(limit) = parse_var("MEETLINE_HISTORY_LIMIT")? {
            config.interim_history_limit = limit;
        }
        if let Some(secs) = parse_var("MEETLINE_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }
        if let Some(prompt) = read_var("MEETLINE_ANSWER_PROMPT") {
            config.answer_prompt = prompt;
        }
        if let Some(lang) = read_var("MEETLINE_LANGUAGE") {
            config.language = lang;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_url.trim().is_empty() {
            return Err(ConfigError::Missing("service_url"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "refresh_interval_secs",
                value: "0".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Credentials and models for the direct OpenAI-compatible backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub transcribe_model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            transcribe_model: "gpt-4o-transcribe".to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = read_var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut config = Self::new(api_key);
        if let Some(url) = read_var("OPENAI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = read_var("MEETLINE_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Some(model) = read_var("MEETLINE_TRANSCRIBE_MODEL") {
            config.transcribe_model = model;
        }
        Ok(config)
    }
}

fn read_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match read_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(None),
    }
}
