//! NewsAPI top-headlines adapter.
//!
//! Top headlines require at least one of `category`, `q` or a country, so a
//! category is always sent: the selected categories, or `general` when none
//! are selected. Author and free-text query share the single `q` parameter.
//!
//! NewsAPI articles have no native id; the article URL stands in for one,
//! and an article without a URL gets a generated `<millis>-<random>` id.

use super::{ProviderAdapter, ProviderRequest, decode, require_key};
use crate::config::ProviderConfig;
use crate::error::{FeedError, Result};
use crate::models::{Article, NewsFilters, ProviderId, SourceRef, clean_description};
use crate::utils::format_date;
use chrono::Utc;
use itertools::Itertools;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

/// Category sent when the filters select none.
const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsApiResponse {
    pub status: Option<String>,
    pub total_results: Option<u64>,
    pub articles: Option<Vec<NewsApiArticle>>,
    /// Present on error bodies.
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsApiArticle {
    pub source: Option<NewsApiSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewsApiSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Stand-in id for an article that has no URL.
fn generated_id() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), rand::rng().random::<u32>())
}

impl From<NewsApiArticle> for Article {
    fn from(article: NewsApiArticle) -> Self {
        let url = article.url.filter(|u| !u.is_empty());
        let source = article.source.unwrap_or_default();
        Article {
            id: url.clone().unwrap_or_else(generated_id),
            title: article.title.unwrap_or_default(),
            description: clean_description(article.description.as_deref().unwrap_or_default()),
            content: article.content.unwrap_or_default(),
            url: url.unwrap_or_default(),
            url_to_image: article.url_to_image.filter(|s| !s.is_empty()),
            published_at: article.published_at.unwrap_or_default(),
            author: article.author.filter(|s| !s.is_empty()),
            source: SourceRef::new(source.id, source.name),
        }
    }
}

/// Adapter for NewsAPI top headlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewsApi;

impl ProviderAdapter for NewsApi {
    fn id(&self) -> ProviderId {
        ProviderId::NewsApi
    }

    fn key_param(&self) -> &'static str {
        "apiKey"
    }

    fn build_request(&self, filters: &NewsFilters, config: &ProviderConfig) -> Result<ProviderRequest> {
        let key = require_key(self.id(), config)?;
        let mut url = config.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("apiKey", key)
                .append_pair("page", &filters.page.max(1).to_string())
                .append_pair("pageSize", &filters.page_size.to_string());

            let terms = [filters.search_query(), filters.author()]
                .into_iter()
                .flatten()
                .join(" ");
            if !terms.is_empty() {
                query.append_pair("q", &terms);
            }

            let category = if filters.categories.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                filters.categories.iter().join("|")
            };
            query.append_pair("category", &category);

            if let Some(from) = filters.date_from {
                query.append_pair("from", &format_date(from));
            }
            if let Some(to) = filters.date_to {
                query.append_pair("to", &format_date(to));
            }
        }
        Ok(ProviderRequest {
            provider: self.id(),
            url,
        })
    }

    fn transform(&self, raw: Value) -> Result<Vec<Article>> {
        let response: NewsApiResponse = decode(self.id(), raw)?;
        if response.status.as_deref() == Some("error") {
            return Err(FeedError::transport(format!(
                "news-api reported {}: {}",
                response.code.as_deref().unwrap_or("an error"),
                response.message.as_deref().unwrap_or("no message")
            )));
        }
        Ok(response
            .articles
            .unwrap_or_default()
            .into_iter()
            .map(Article::from)
            .collect())
    }
}
