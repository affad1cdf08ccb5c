use thiserror::Error;

/// Failure of a remote enrichment call (translate, answer detection, transcribe).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    /// Non-2xx response carrying `{error: <message>}`. The message is user-facing.
    #[error("{0}")]
    Service(String),
    /// Non-2xx response without a usable `error` field.
    #[error("service responded with status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("audio clip is {size} bytes, the limit is {limit} bytes")]
    AudioTooLarge { size: usize, limit: usize },
    /// Superseded or torn down. Never shown to the user.
    #[error("request canceled")]
    Canceled,
}

impl EnrichmentError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, EnrichmentError::Canceled)
    }

    /// Text to put in front of the user. Failures that carry no message of
    /// their own fall back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            EnrichmentError::Service(msg) if !msg.trim().is_empty() => msg.clone(),
            EnrichmentError::Service(_) | EnrichmentError::Status(_) | EnrichmentError::Canceled => {
                fallback.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EnrichmentError::Network("request timed out".to_string())
        } else if e.is_decode() {
            EnrichmentError::Decode(e.to_string())
        } else {
            EnrichmentError::Network(e.to_string())
        }
    }
}

/// Errors raised by a speech recognition engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognizerError {
    #[error("recognition is already running")]
    AlreadyStarted,
    #[error("{0}")]
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("missing required setting {0}")]
    Missing(&'static str),
}
