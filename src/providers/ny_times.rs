//! New York Times article search adapter.
//!
//! The article search endpoint paginates from 0 and serves fixed-size pages,
//! so the filter page is shifted down by one and no page size is sent.
//! Sections and bylines are expressed as `fq` filter queries, and the date
//! range uses dashless `YYYYMMDD` dates.

use super::{ProviderAdapter, ProviderRequest, decode, require_key};
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::models::{Article, NewsFilters, ProviderId, SourceRef, clean_description};
use crate::utils::format_compact_date;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesResponse {
    pub response: Option<NyTimesBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesBody {
    pub docs: Option<Vec<NyTimesDoc>>,
    pub meta: Option<NyTimesMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesMeta {
    pub hits: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesDoc {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub headline: Option<NyTimesHeadline>,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub web_url: Option<String>,
    pub pub_date: Option<String>,
    pub byline: Option<NyTimesByline>,
    pub lead_paragraph: Option<String>,
    pub multimedia: Option<NyTimesMultimedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesHeadline {
    pub main: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesByline {
    pub original: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesMultimedia {
    pub caption: Option<String>,
    pub credit: Option<String>,
    pub default: Option<NyTimesImage>,
    pub thumbnail: Option<NyTimesImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NyTimesImage {
    pub url: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

impl NyTimesMultimedia {
    /// Full-size image if there is one, otherwise the thumbnail.
    fn best_url(self) -> Option<String> {
        let pick = |image: Option<NyTimesImage>| image.and_then(|i| i.url).filter(|u| !u.is_empty());
        pick(self.default).or_else(|| pick(self.thumbnail))
    }
}

impl From<NyTimesDoc> for Article {
    fn from(doc: NyTimesDoc) -> Self {
        Article {
            id: doc.id.unwrap_or_default(),
            title: doc.headline.and_then(|h| h.main).unwrap_or_default(),
            description: clean_description(doc.summary.as_deref().unwrap_or_default()),
            content: doc.lead_paragraph.unwrap_or_default(),
            url: doc.web_url.unwrap_or_default(),
            url_to_image: doc.multimedia.and_then(NyTimesMultimedia::best_url),
            published_at: doc.pub_date.unwrap_or_default(),
            author: doc.byline.and_then(|b| b.original).filter(|s| !s.is_empty()),
            source: SourceRef::provider(ProviderId::NyTimes),
        }
    }
}

/// Adapter for the New York Times article search API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NyTimes;

impl ProviderAdapter for NyTimes {
    fn id(&self) -> ProviderId {
        ProviderId::NyTimes
    }

    fn key_param(&self) -> &'static str {
        "api-key"
    }

    fn build_request(&self, filters: &NewsFilters, config: &ProviderConfig) -> Result<ProviderRequest> {
        let key = require_key(self.id(), config)?;
        let mut url = config.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("api-key", key)
                .append_pair("page", &filters.page.saturating_sub(1).to_string());

            if let Some(q) = filters.search_query() {
                query.append_pair("q", q);
            }
            if !filters.categories.is_empty() {
                let sections = filters.categories.iter().join("|");
                query.append_pair("fq", &format!("section_name:{sections}"));
            }
            if let Some(author) = filters.author() {
                query.append_pair("fq", &format!("byline:(\"{author}\")"));
            }
            if let Some(from) = filters.date_from {
                query.append_pair("begin_date", &format_compact_date(from));
            }
            if let Some(to) = filters.date_to {
                query.append_pair("end_date", &format_compact_date(to));
            }
        }
        Ok(ProviderRequest {
            provider: self.id(),
            url,
        })
    }

    fn transform(&self, raw: Value) -> Result<Vec<Article>> {
        let response: NyTimesResponse = decode(self.id(), raw)?;
        Ok(response
            .response
            .and_then(|body| body.docs)
            .unwrap_or_default()
            .into_iter()
            .map(Article::from)
            .collect())
    }
}
