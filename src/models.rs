//! Data models shared by the providers, the aggregation engine and the feed controller.
//!
//! This module defines the provider-agnostic shapes used throughout the crate:
//! - [`Article`]: a normalized news article, whatever provider it came from
//! - [`ProviderId`]: the closed set of upstream news providers
//! - [`Category`]: the topic categories a feed can be narrowed to
//! - [`NewsFilters`]: the single filter model every provider request is built from
//! - [`FilterPatch`]: a partial update applied to [`NewsFilters`]
//!
//! Field names serialize in camelCase so snapshots and remembered filters keep
//! the same JSON/YAML shape the feed has always exposed to clients.

use crate::utils::{strip_html, truncate_chars};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Number of articles requested from each provider per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum length, in characters, of [`Article::description`].
pub const DESCRIPTION_LIMIT: usize = 200;

/// Source name used when a provider does not say who published an article.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// One upstream news provider.
///
/// The declaration order is the feed order: all Guardian pages come first,
/// then New York Times pages, then NewsAPI pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    /// The Guardian content search API.
    #[serde(rename = "guardian")]
    Guardian,
    /// The New York Times full-text article search API.
    #[serde(rename = "ny-times")]
    NyTimes,
    /// NewsAPI top headlines.
    #[serde(rename = "news-api")]
    NewsApi,
}

impl ProviderId {
    /// Every provider, in feed order.
    pub const ALL: [ProviderId; 3] = [ProviderId::Guardian, ProviderId::NyTimes, ProviderId::NewsApi];

    /// Stable identifier used on the wire, in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Guardian => "guardian",
            ProviderId::NyTimes => "ny-times",
            ProviderId::NewsApi => "news-api",
        }
    }

    /// Human readable provider name.
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderId::Guardian => "The Guardian",
            ProviderId::NyTimes => "The New York Times",
            ProviderId::NewsApi => "NewsAPI",
        }
    }

    /// Position of this provider in [`ProviderId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider `{s}` (expected guardian, ny-times or news-api)"))
    }
}

/// Topic category a feed can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Science,
    Business,
    Health,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Technology,
        Category::Science,
        Category::Business,
        Category::Health,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Science => "science",
            Category::Business => "business",
            Category::Health => "health",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}

/// Who published an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Provider-native source identifier, when there is one.
    pub id: Option<String>,
    /// Display name; [`UNKNOWN_SOURCE`] when the provider gives none.
    pub name: String,
}

impl SourceRef {
    pub fn new(id: Option<String>, name: Option<String>) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()),
            name: name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        }
    }

    /// Source reference naming one of our own providers.
    pub fn provider(provider: ProviderId) -> Self {
        Self {
            id: Some(provider.as_str().to_string()),
            name: provider.display_name().to_string(),
        }
    }
}

/// A normalized news article.
///
/// Every provider transform produces this shape. `id` is only unique within
/// one provider's results; key on `(ProviderId, id)` when global uniqueness
/// matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Plain-text summary, at most [`DESCRIPTION_LIMIT`] characters.
    pub description: String,
    pub content: String,
    /// Canonical link; empty when the provider omits it.
    pub url: String,
    pub url_to_image: Option<String>,
    /// Publication date in the provider's own representation.
    pub published_at: String,
    pub author: Option<String>,
    pub source: SourceRef,
}

/// Turn a raw provider summary into an [`Article::description`].
///
/// Markup is removed first, then the text is cut to [`DESCRIPTION_LIMIT`]
/// characters (never inside a multi-byte character).
pub fn clean_description(raw: &str) -> String {
    truncate_chars(&strip_html(raw), DESCRIPTION_LIMIT)
}

/// The filter model every provider request is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsFilters {
    /// Providers to query. Defaults to all of them.
    pub sources: BTreeSet<ProviderId>,
    #[serde(default)]
    pub categories: BTreeSet<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl Default for NewsFilters {
    fn default() -> Self {
        Self {
            sources: ProviderId::ALL.into_iter().collect(),
            categories: BTreeSet::new(),
            author: None,
            search_query: None,
            date_from: None,
            date_to: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl NewsFilters {
    /// Default filters with a specific page size.
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    /// Merge `patch` into these filters.
    ///
    /// Any edit, whatever it touches, sends the feed back to page 1.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(sources) = patch.sources {
            self.sources = sources;
        }
        if let Some(categories) = patch.categories {
            self.categories = categories;
        }
        if let Some(author) = patch.author {
            self.author = Some(author);
        }
        if let Some(query) = patch.search_query {
            self.search_query = Some(query);
        }
        if let Some(from) = patch.date_from {
            self.date_from = from;
        }
        if let Some(to) = patch.date_to {
            self.date_to = to;
        }
        if let Some(page_size) = patch.page_size {
            self.page_size = page_size.max(1);
        }
        self.page = 1;
    }

    /// Author filter, if one is set and not blank.
    pub fn author(&self) -> Option<&str> {
        non_blank(self.author.as_deref())
    }

    /// Free-text query, if one is set and not blank.
    pub fn search_query(&self) -> Option<&str> {
        non_blank(self.search_query.as_deref())
    }

    /// Whether `provider` is one of the selected sources.
    pub fn includes(&self, provider: ProviderId) -> bool {
        self.sources.contains(&provider)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// A partial edit of [`NewsFilters`].
///
/// `None` leaves a field untouched. Dates use a nested option so an edit can
/// clear them (`Some(None)`); an empty author or query string clears those.
/// The page number is not part of a patch: edits always restart at page 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeSet<ProviderId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeSet<Category>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl FilterPatch {
    pub fn sources(sources: impl IntoIterator<Item = ProviderId>) -> Self {
        Self {
            sources: Some(sources.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self {
            search_query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Overlay `other` on top of this patch; fields set in `other` win.
    pub fn merge(&mut self, other: FilterPatch) {
        if other.sources.is_some() {
            self.sources = other.sources;
        }
        if other.categories.is_some() {
            self.categories = other.categories;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.search_query.is_some() {
            self.search_query = other.search_query;
        }
        if other.date_from.is_some() {
            self.date_from = other.date_from;
        }
        if other.date_to.is_some() {
            self.date_to = other.date_to;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterPatch::default()
    }
}

impl From<&NewsFilters> for FilterPatch {
    /// Everything but the pagination cursor.
    fn from(filters: &NewsFilters) -> Self {
        Self {
            sources: Some(filters.sources.clone()),
            categories: Some(filters.categories.clone()),
            author: filters.author.clone(),
            search_query: filters.search_query.clone(),
            date_from: Some(filters.date_from),
            date_to: Some(filters.date_to),
            page_size: None,
        }
    }
}
