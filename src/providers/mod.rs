//! Provider adapters for the upstream news APIs.
//!
//! Each provider is handled by an adapter with the same three-step contract:
//!
//! 1. **Build**: turn the shared [`NewsFilters`] into a provider-specific
//!    [`ProviderRequest`] (pure, deterministic)
//! 2. **Execute**: perform exactly one network call through a [`Transport`]
//! 3. **Transform**: map the raw JSON body into normalized [`Article`]s (pure)
//!
//! # Supported Providers
//!
//! | Provider | Module | Pagination | Date format |
//! |----------|--------|------------|-------------|
//! | The Guardian | [`guardian`] | 1-based, `page-size` | `YYYY-MM-DD` |
//! | New York Times | [`ny_times`] | 0-based, fixed size | `YYYYMMDD` |
//! | NewsAPI | [`news_api`] | 1-based, `pageSize` | `YYYY-MM-DD` |
//!
//! Adapters are looked up by [`ProviderId`] through [`adapter_for`], and
//! [`ProviderClient`] strings the three steps together behind the
//! [`ArticleSource`] trait the aggregation engine consumes.
//!
//! Adapters never retry. A failed call is reported once, as a [`FeedError`].

use crate::config::{FeedConfig, ProviderConfig};
use crate::error::{FeedError, Result};
use crate::models::{Article, NewsFilters, ProviderId};
use crate::utils::{looks_truncated, truncate_for_log};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub mod guardian;
pub mod news_api;
pub mod ny_times;

/// A provider-specific request, ready to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub provider: ProviderId,
    pub url: Url,
}

impl ProviderRequest {
    /// The request URL with the API key hidden, for logging.
    pub fn redacted(&self) -> String {
        let key_param = adapter_for(self.provider).key_param();
        let mut url = self.url.clone();
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == key_param { "***".to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url.to_string()
    }
}

/// Uniform contract every provider adapter implements.
///
/// Both methods are pure; the network call in between belongs to the
/// [`Transport`].
pub trait ProviderAdapter: Sync {
    fn id(&self) -> ProviderId;

    /// Query parameter carrying the API key.
    fn key_param(&self) -> &'static str;

    /// Map the shared filters to a provider request.
    ///
    /// Parameters whose filter is absent or empty are omitted, never sent
    /// empty.
    ///
    /// # Errors
    ///
    /// [`FeedError::Configuration`] when the provider has no API key.
    fn build_request(&self, filters: &NewsFilters, config: &ProviderConfig) -> Result<ProviderRequest>;

    /// Map a raw response body to normalized articles.
    ///
    /// Sparse bodies (missing or null optional fields) normalize to the
    /// documented defaults. A body that is not an object, or whose fields
    /// have the wrong types, is a [`FeedError::Parse`].
    fn transform(&self, raw: Value) -> Result<Vec<Article>>;
}

/// Adapter lookup table, indexed by [`ProviderId::index`].
static ADAPTERS: [&dyn ProviderAdapter; 3] = [
    &guardian::Guardian,
    &ny_times::NyTimes,
    &news_api::NewsApi,
];

/// The adapter responsible for `provider`.
pub fn adapter_for(provider: ProviderId) -> &'static dyn ProviderAdapter {
    ADAPTERS[provider.index()]
}

/// Fetch the API key of `provider`, failing fast when it is missing.
pub(crate) fn require_key(provider: ProviderId, config: &ProviderConfig) -> Result<&str> {
    config
        .api_key()
        .ok_or_else(|| FeedError::Configuration(format!("no API key configured for {provider}")))
}

/// Deserialize a raw body into a provider response shape.
pub(crate) fn decode<T: DeserializeOwned>(provider: ProviderId, raw: Value) -> Result<T> {
    if !raw.is_object() {
        return Err(FeedError::Parse(format!(
            "{provider} response is not a JSON object: {}",
            truncate_for_log(&raw.to_string(), 120)
        )));
    }
    serde_json::from_value(raw).map_err(|e| FeedError::Parse(format!("{provider} response: {e}")))
}

/// Executes provider requests.
///
/// One call, one network round trip. Implementations must not retry.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: &ProviderRequest) -> impl Future<Output = Result<Value>> + Send;
}

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport honoring the configured user agent and timeout.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        Self::with_timeout(&config.user_agent, config.request_timeout())
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(provider = %request.provider))]
    async fn execute(&self, request: &ProviderRequest) -> Result<Value> {
        let t0 = Instant::now();
        let response = self.client.get(request.url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body_preview = %truncate_for_log(&body, 200),
                "Provider returned an error status"
            );
            return Err(FeedError::status(
                status.as_u16(),
                format!("{} responded with {}", request.provider, status),
            ));
        }

        let bytes = response.bytes().await?;
        debug!(
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Provider response received"
        );
        serde_json::from_slice(&bytes).map_err(|e| {
            if looks_truncated(&e) {
                warn!(error = %e, "Provider body ended early");
            } else {
                warn!(
                    error = %e,
                    body_preview = %truncate_for_log(&String::from_utf8_lossy(&bytes), 200),
                    "Provider body is not JSON"
                );
            }
            FeedError::from(e)
        })
    }
}

/// Something that can produce one page of normalized articles per provider.
///
/// The aggregation engine only ever talks to this trait, so tests can swap
/// the network for scripted doubles.
pub trait ArticleSource: Send + Sync + 'static {
    fn fetch_articles(
        &self,
        provider: ProviderId,
        filters: &NewsFilters,
    ) -> impl Future<Output = Result<Vec<Article>>> + Send;
}

/// [`ArticleSource`] that runs the build/execute/transform pipeline of each
/// provider adapter.
#[derive(Debug, Clone)]
pub struct ProviderClient<T = HttpTransport> {
    transport: T,
    config: FeedConfig,
}

impl ProviderClient<HttpTransport> {
    /// Client talking HTTP to the configured endpoints.
    pub fn http(config: FeedConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> ProviderClient<T> {
    pub fn new(transport: T, config: FeedConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

impl<T: Transport> ArticleSource for ProviderClient<T> {
    #[instrument(level = "info", skip_all, fields(provider = %provider, page = filters.page))]
    async fn fetch_articles(&self, provider: ProviderId, filters: &NewsFilters) -> Result<Vec<Article>> {
        let adapter = adapter_for(provider);
        let request = adapter.build_request(filters, self.config.provider(provider))?;
        debug!(url = %request.redacted(), "Requesting provider page");

        let raw = self.transport.execute(&request).await?;
        let articles = adapter.transform(raw)?;
        info!(count = articles.len(), "Normalized provider page");
        Ok(articles)
    }
}
