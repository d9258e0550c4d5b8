//! Command-line interface definitions for the news feed driver.
//!
//! Filter flags describe an edit on top of the remembered filters: a flag
//! that is not given leaves the remembered value in place. API keys can be
//! given as flags or through the environment.

use crate::models::{Category, FilterPatch, ProviderId};
use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for the news feed driver.
///
/// # Examples
///
/// ```sh
/// # Everything, first page only
/// awful_news_feed -j ./json
///
/// # Two providers, technology only, three pages, plus Markdown
/// awful_news_feed -j ./json -m ./markdown \
///     --source guardian --source news-api --category technology --pages 3
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for JSON feed snapshots
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Output directory for Markdown feed snapshots
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Optional path to a feed config YAML file
    #[arg(short, long)]
    pub config: Option<String>,

    /// File remembering the last used filters
    #[arg(short, long)]
    pub settings: Option<String>,

    /// Provider to query (repeatable): guardian, ny-times, news-api
    #[arg(long = "source")]
    pub sources: Vec<ProviderId>,

    /// Category to narrow to (repeatable): technology, science, business, health
    #[arg(long = "category")]
    pub categories: Vec<Category>,

    /// Only articles by this author
    #[arg(long)]
    pub author: Option<String>,

    /// Free-text search
    #[arg(short, long)]
    pub query: Option<String>,

    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest publication date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Number of pages to load
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: u32,

    /// Articles per provider per page (overrides the config file)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// The Guardian API key
    #[arg(long, env = "GUARDIAN_API_KEY", hide_env_values = true)]
    pub guardian_api_key: Option<String>,

    /// New York Times API key
    #[arg(long, env = "NYT_API_KEY", hide_env_values = true)]
    pub nyt_api_key: Option<String>,

    /// NewsAPI key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,
}

impl Cli {
    /// The filter edit described by the flags.
    pub fn filter_patch(&self) -> FilterPatch {
        FilterPatch {
            sources: (!self.sources.is_empty()).then(|| self.sources.iter().copied().collect()),
            categories: (!self.categories.is_empty()).then(|| self.categories.iter().copied().collect()),
            author: self.author.clone(),
            search_query: self.query.clone(),
            date_from: self.from.map(Some),
            date_to: self.to.map(Some),
            page_size: None,
        }
    }

    /// API keys given on the command line or in the environment.
    pub fn api_keys(&self) -> [(ProviderId, Option<String>); 3] {
        [
            (ProviderId::Guardian, self.guardian_api_key.clone()),
            (ProviderId::NyTimes, self.nyt_api_key.clone()),
            (ProviderId::NewsApi, self.news_api_key.clone()),
        ]
    }
}
