//! The Guardian content search API adapter.
//!
//! Requests go to `https://content.guardianapis.com/search` with
//! `show-fields=thumbnail,body` so each result carries its body HTML and
//! thumbnail. Pagination is 1-based and the page size is sent explicitly.
//! Search results carry no byline, so normalized articles have no author.

use super::{ProviderAdapter, ProviderRequest, decode, require_key};
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::models::{Article, NewsFilters, ProviderId, SourceRef, clean_description};
use crate::utils::{format_date, slugify};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GuardianResponse {
    pub response: Option<GuardianBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GuardianBody {
    pub status: Option<String>,
    pub total: Option<u64>,
    pub results: Option<Vec<GuardianResult>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuardianResult {
    pub id: Option<String>,
    pub web_title: Option<String>,
    pub web_url: Option<String>,
    pub web_publication_date: Option<String>,
    pub fields: Option<GuardianFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GuardianFields {
    pub thumbnail: Option<String>,
    pub body: Option<String>,
}

impl From<GuardianResult> for Article {
    fn from(result: GuardianResult) -> Self {
        let fields = result.fields.unwrap_or_default();
        let body = fields.body.unwrap_or_default();
        Article {
            id: result.id.unwrap_or_default(),
            title: result.web_title.unwrap_or_default(),
            description: clean_description(&body),
            content: body,
            url: result.web_url.unwrap_or_default(),
            url_to_image: fields.thumbnail.filter(|s| !s.is_empty()),
            published_at: result.web_publication_date.unwrap_or_default(),
            author: None,
            source: SourceRef::provider(ProviderId::Guardian),
        }
    }
}

/// Adapter for the Guardian content search API.
#[derive(Debug, Clone, Copy, Default)]
pub struct Guardian;

impl ProviderAdapter for Guardian {
    fn id(&self) -> ProviderId {
        ProviderId::Guardian
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
                .append_pair("page", &filters.page.max(1).to_string())
                .append_pair("page-size", &filters.page_size.to_string())
                .append_pair("show-fields", "thumbnail,body");

            if let Some(q) = filters.search_query() {
                query.append_pair("q", q);
            }
            if !filters.categories.is_empty() {
                query.append_pair("section", &filters.categories.iter().join("|"));
            }
            if let Some(from) = filters.date_from {
                query.append_pair("from-date", &format_date(from));
            }
            if let Some(to) = filters.date_to {
                query.append_pair("to-date", &format_date(to));
            }
            // Contributors are tags of the form profile/<slug>.
            if let Some(author) = filters.author() {
                query.append_pair("tag", &format!("profile/{}", slugify(author)));
            }
        }
        Ok(ProviderRequest {
            provider: self.id(),
            url,
        })
    }

    fn transform(&self, raw: Value) -> Result<Vec<Article>> {
        let response: GuardianResponse = decode(self.id(), raw)?;
        Ok(response
            .response
            .and_then(|body| body.results)
            .unwrap_or_default()
            .into_iter()
            .map(Article::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::models::Category;
    use crate::providers::tests::{keyed, param, params};
    use chrono::NaiveDate;
    use serde_json::json;

    fn build(filters: &NewsFilters) -> ProviderRequest {
        Guardian
            .build_request(filters, &keyed(ProviderId::Guardian))
            .unwrap()
    }

    #[test]
    fn test_transform_full_response() {
        let raw = json!({
            "response": {
                "status": "ok",
                "total": 2,
                "results": [
                    {
                        "id": "test-id-1",
                        "webTitle": "Test Article 1",
                        "webUrl": "https://example.com/article1",
                        "webPublicationDate": "2024-01-01T10:00:00Z",
                        "fields": {
                            "thumbnail": "https://example.com/image1.jpg",
                            "body": "<p>This is a test article body with <strong>HTML</strong> content.</p>"
                        }
                    },
                    {
                        "id": "test-id-2",
                        "webTitle": "Test Article 2",
                        "webUrl": "https://example.com/article2",
                        "webPublicationDate": "2024-01-02T11:00:00Z",
                        "fields": { "body": "<p>Another article body.</p>" }
                    }
                ]
            }
        });

        let articles = Guardian.transform(raw).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(
            articles[0],
            Article {
                id: "test-id-1".to_string(),
                title: "Test Article 1".to_string(),
                description: "This is a test article body with HTML content.".to_string(),
                content: "<p>This is a test article body with <strong>HTML</strong> content.</p>"
                    .to_string(),
                url: "https://example.com/article1".to_string(),
                url_to_image: Some("https://example.com/image1.jpg".to_string()),
                published_at: "2024-01-01T10:00:00Z".to_string(),
                author: None,
                source: SourceRef {
                    id: Some("guardian".to_string()),
                    name: "The Guardian".to_string(),
                },
            }
        );
        assert_eq!(articles[1].url_to_image, None);
        assert_eq!(articles[1].description, "Another article body.");
    }

    #[test]
    fn test_transform_empty_and_missing_results() {
        assert!(Guardian.transform(json!({ "response": { "results": [] } })).unwrap().is_empty());
        assert!(Guardian.transform(json!({ "response": {} })).unwrap().is_empty());
        assert!(Guardian.transform(json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_transform_sparse_result() {
        let articles = Guardian
            .transform(json!({ "response": { "results": [ { "id": null } ] } }))
            .unwrap();
        let article = &articles[0];
        assert_eq!(article.id, "");
        assert_eq!(article.title, "");
        assert_eq!(article.description, "");
        assert_eq!(article.content, "");
        assert_eq!(article.url, "");
        assert_eq!(article.url_to_image, None);
        assert_eq!(article.published_at, "");
    }

    #[test]
    fn test_transform_truncates_description() {
        let body = "a".repeat(300);
        let articles = Guardian
            .transform(json!({ "response": { "results": [ { "fields": { "body": body } } ] } }))
            .unwrap();
        assert_eq!(articles[0].description.len(), 200);
        assert_eq!(articles[0].content.len(), 300);
    }

    #[test]
    fn test_transform_rejects_mistyped_results() {
        let err = Guardian
            .transform(json!({ "response": { "results": "nope" } }))
            .unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn test_build_minimal_request() {
        let request = build(&NewsFilters::default());
        assert_eq!(request.url.path(), "/search");
        assert_eq!(
            params(&request),
            vec![
                ("api-key".to_string(), "test-api-key".to_string()),
                ("page".to_string(), "1".to_string()),
                ("page-size".to_string(), "10".to_string()),
                ("show-fields".to_string(), "thumbnail,body".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_with_every_filter() {
        let filters = NewsFilters {
            categories: [Category::Technology, Category::Science].into_iter().collect(),
            search_query: Some("climate change".to_string()),
            author: Some("Jane Doe".to_string()),
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            page: 2,
            page_size: 20,
            ..NewsFilters::default()
        };
        let request = build(&filters);
        assert_eq!(param(&request, "page").as_deref(), Some("2"));
        assert_eq!(param(&request, "page-size").as_deref(), Some("20"));
        assert_eq!(param(&request, "q").as_deref(), Some("climate change"));
        assert_eq!(param(&request, "section").as_deref(), Some("technology|science"));
        assert_eq!(param(&request, "from-date").as_deref(), Some("2024-01-01"));
        assert_eq!(param(&request, "to-date").as_deref(), Some("2024-01-31"));
        assert_eq!(param(&request, "tag").as_deref(), Some("profile/jane-doe"));
    }

    #[test]
    fn test_build_omits_empty_filters() {
        let filters = NewsFilters {
            search_query: Some("  ".to_string()),
            author: Some(String::new()),
            ..NewsFilters::default()
        };
        let request = build(&filters);
        for name in ["q", "section", "from-date", "to-date", "tag"] {
            assert_eq!(param(&request, name), None, "{name} should be omitted");
        }
    }
}
