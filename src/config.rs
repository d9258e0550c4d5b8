//! Feed configuration: provider credentials, endpoints and feed tuning.
//!
//! Configuration is an explicit value handed to the provider client at
//! construction. Nothing in the crate reads API keys from ambient state, so
//! tests and multiple concurrently configured feeds are straightforward.
//!
//! # File Format
//!
//! ```yaml
//! page_size: 10
//! debounce_ms: 500
//! request_timeout_secs: 15
//! guardian:
//!   api_key: "..."
//! ny_times:
//!   api_key: "..."
//!   base_url: "https://api.nytimes.com/svc/search/v2/articlesearch.json"
//! news_api:
//!   api_key: "..."
//! ```
//!
//! Every field is optional. Keys given on the command line or through the
//! environment override the file.

use crate::models::{DEFAULT_PAGE_SIZE, ProviderId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const GUARDIAN_BASE_URL: &str = "https://content.guardianapis.com/search";
pub const NY_TIMES_BASE_URL: &str = "https://api.nytimes.com/svc/search/v2/articlesearch.json";
pub const NEWS_API_BASE_URL: &str = "https://newsapi.org/v2/top-headlines";

/// Quiet period after the last filter edit before a fetch is issued.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Credentials and endpoint for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: Url,
}

impl ProviderConfig {
    /// Default configuration (no key, public endpoint) for `provider`.
    pub fn for_provider(provider: ProviderId) -> Self {
        let base = match provider {
            ProviderId::Guardian => GUARDIAN_BASE_URL,
            ProviderId::NyTimes => NY_TIMES_BASE_URL,
            ProviderId::NewsApi => NEWS_API_BASE_URL,
        };
        Self {
            api_key: None,
            base_url: Url::parse(base).expect("built-in provider URL is valid"),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Partial provider section as written in a config file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProviderSection {
    api_key: Option<String>,
    base_url: Option<Url>,
}

impl ProviderSection {
    fn into_config(self, provider: ProviderId) -> ProviderConfig {
        let defaults = ProviderConfig::for_provider(provider);
        ProviderConfig {
            api_key: self.api_key,
            base_url: self.base_url.unwrap_or(defaults.base_url),
        }
    }
}

/// Top-level configuration for a news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub guardian: ProviderConfig,
    pub ny_times: ProviderConfig,
    pub news_api: ProviderConfig,
    /// Articles requested per provider per page.
    pub page_size: u32,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            guardian: ProviderConfig::for_provider(ProviderId::Guardian),
            ny_times: ProviderConfig::for_provider(ProviderId::NyTimes),
            news_api: ProviderConfig::for_provider(ProviderId::NewsApi),
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: format!("awful_news_feed/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Config file shape: every field optional.
#[derive(Debug, Default, Deserialize)]
struct FeedConfigFile {
    #[serde(default)]
    guardian: ProviderSection,
    #[serde(default)]
    ny_times: ProviderSection,
    #[serde(default)]
    news_api: ProviderSection,
    page_size: Option<u32>,
    debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

impl From<FeedConfigFile> for FeedConfig {
    fn from(file: FeedConfigFile) -> Self {
        let defaults = FeedConfig::default();
        Self {
            guardian: file.guardian.into_config(ProviderId::Guardian),
            ny_times: file.ny_times.into_config(ProviderId::NyTimes),
            news_api: file.news_api.into_config(ProviderId::NewsApi),
            page_size: file.page_size.unwrap_or(defaults.page_size).max(1),
            debounce_ms: file.debounce_ms.unwrap_or(defaults.debounce_ms),
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            user_agent: file.user_agent.unwrap_or(defaults.user_agent),
        }
    }
}

impl FeedConfig {
    /// Parse a YAML config document.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let file: FeedConfigFile = serde_yaml::from_str(yaml)?;
        Ok(file.into())
    }

    /// Load configuration from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let yaml = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml(&yaml)?;
        info!(
            page_size = config.page_size,
            debounce_ms = config.debounce_ms,
            "Loaded feed configuration"
        );
        Ok(config)
    }

    pub fn provider(&self, provider: ProviderId) -> &ProviderConfig {
        match provider {
            ProviderId::Guardian => &self.guardian,
            ProviderId::NyTimes => &self.ny_times,
            ProviderId::NewsApi => &self.news_api,
        }
    }

    pub fn provider_mut(&mut self, provider: ProviderId) -> &mut ProviderConfig {
        match provider {
            ProviderId::Guardian => &mut self.guardian,
            ProviderId::NyTimes => &mut self.ny_times,
            ProviderId::NewsApi => &mut self.news_api,
        }
    }

    /// Replace the API key of `provider` when `key` is given.
    pub fn override_api_key(&mut self, provider: ProviderId, key: Option<String>) {
        if let Some(key) = key {
            self.provider_mut(provider).api_key = Some(key);
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
