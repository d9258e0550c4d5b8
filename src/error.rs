//! Error types for provider calls.
//!
//! Every failure a single provider call can produce is one of three kinds.
//! None of them is fatal to the feed: the aggregation engine records them per
//! provider and keeps whatever the other providers returned.

use crate::models::ProviderId;
use serde::Serialize;
use thiserror::Error;

/// Failure of one provider call.
///
/// Variants hold rendered messages rather than source errors so a failure
/// can be cloned into feed snapshots.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum FeedError {
    /// Network failure or a non-2xx response.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
    },

    /// The response body could not be normalized into articles.
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider is missing credentials or has an unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FeedError {
    pub fn transport(message: impl Into<String>) -> Self {
        FeedError::Transport {
            message: message.into(),
            status: None,
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        FeedError::Transport {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::Transport {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(e: url::ParseError) -> Self {
        FeedError::Configuration(format!("invalid provider URL: {e}"))
    }
}

/// A provider call that failed, tagged with the provider it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: FeedError,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Result type alias for provider calls.
pub type Result<T> = std::result::Result<T, FeedError>;
