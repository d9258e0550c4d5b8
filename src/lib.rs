//! # Awful News Feed
//!
//! One paginated news feed over several search APIs.
//!
//! - [`providers`]: per-provider adapters mapping shared [`NewsFilters`]
//!   to requests and raw responses to normalized [`Article`]s
//! - [`aggregator`]: per-provider pagination cursors, fan-out fetches and
//!   the ordered feed
//! - [`controller`]: the live feed, with debounced filter edits,
//!   immediate load-more and published snapshots
//!
//! ```no_run
//! use awful_news_feed::{FeedConfig, FeedOptions, FilterPatch, NewsFeed, ProviderClient};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FeedConfig::default();
//! let feed = NewsFeed::mount(ProviderClient::http(config.clone())?, FeedOptions::from_config(&config));
//! let first = feed.settled().await;
//!
//! feed.on_filters_change(FilterPatch::search("climate"));
//! let filtered = feed.settled().await;
//! # let _ = (first, filtered);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod outputs;
pub mod providers;
pub mod settings;
pub mod utils;

pub use aggregator::{Aggregator, ProviderState};
pub use config::{FeedConfig, ProviderConfig};
pub use controller::{FeedOptions, FeedPhase, FeedView, NewsFeed};
pub use error::{FeedError, ProviderFailure};
pub use models::{Article, Category, FilterPatch, NewsFilters, ProviderId, SourceRef};
pub use providers::{ArticleSource, ProviderClient};
pub use settings::FeedSettings;
