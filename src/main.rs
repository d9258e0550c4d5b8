//! # Awful News Feed
//!
//! Command-line driver for the multi-provider news feed. It mounts a
//! [`NewsFeed`] over the Guardian, New York Times and NewsAPI search APIs,
//! waits for the first page, loads more pages on request, and writes the
//! settled feed as JSON and, optionally, Markdown.
//!
//! ## Usage
//!
//! ```sh
//! GUARDIAN_API_KEY=... NYT_API_KEY=... NEWS_API_KEY=... \
//!     awful_news_feed -j ./json -m ./markdown --query climate --pages 2
//! ```
//!
//! ## Flow
//!
//! 1. **Configure**: config file, then API keys from flags or environment
//! 2. **Restore**: remembered filters, with the filter flags applied on top
//! 3. **Fetch**: page 1 from every selected provider, then `--pages - 1`
//!    more pages while any provider has more
//! 4. **Output**: JSON snapshot, Markdown rendering and the Markdown index
//!
//! A provider that fails is logged and left out; it never fails the run.

use awful_news_feed::cli::Cli;
use awful_news_feed::config::FeedConfig;
use awful_news_feed::controller::{FeedOptions, FeedView, NewsFeed};
use awful_news_feed::outputs::{indexes, json, markdown};
use awful_news_feed::providers::ProviderClient;
use awful_news_feed::settings::FeedSettings;
use awful_news_feed::utils::ensure_writable_dir;
use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

fn log_failures(view: &FeedView) {
    for failure in &view.failures {
        warn!(provider = %failure.provider, error = %failure.error, "Provider left out of this page");
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_news_feed starting up");

    let args = Cli::parse();
    debug!(?args.json_output_dir, ?args.markdown_output_dir, pages = args.pages, "Parsed CLI arguments");

    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => FeedConfig::load(path).await?,
        None => FeedConfig::default(),
    };
    for (provider, key) in args.api_keys() {
        config.override_api_key(provider, key);
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size.max(1);
    }
    for (provider, _) in args.api_keys() {
        if config.provider(provider).api_key().is_none() {
            warn!(%provider, "No API key configured; this provider will fail");
        }
    }

    // ---- Remembered filters ----
    let mut settings = match &args.settings {
        Some(path) => FeedSettings::load(path).await?,
        None => FeedSettings::default(),
    };
    settings.merge(args.filter_patch());
    let initial_filters = settings.filters.clone();

    let mut options = FeedOptions::from_config(&config).initial_filters(initial_filters);
    if let Some(path) = args.settings.clone() {
        let settings = Arc::new(Mutex::new(settings));
        options = options.on_change(move |filters| {
            let mut settings = settings.lock().unwrap_or_else(PoisonError::into_inner);
            settings.remember(filters);
            if let Err(e) = settings.save(&path) {
                warn!(path = %path, error = %e, "Failed to save remembered filters");
            }
        });
    }

    // ---- Fetch ----
    let source = ProviderClient::http(config)?;
    let feed = NewsFeed::mount(source, options);

    let mut view = feed.settled().await;
    log_failures(&view);
    info!(items = view.items.len(), has_more = view.has_more, "First page loaded");

    for _ in 1..args.pages {
        if !feed.load_more() {
            info!(page = feed.active_filters().page, "No more pages to load");
            break;
        }
        view = feed.settled().await;
        log_failures(&view);
        info!(
            page = view.filters.page,
            items = view.items.len(),
            has_more = view.has_more,
            "Page loaded"
        );
    }

    // ---- Output ----
    let generated_at = Local::now();
    if let Err(e) = json::write_feed(&view, &args.json_output_dir, generated_at).await {
        error!(error = %e, "Failed to write JSON feed");
    }

    if let Some(markdown_output_dir) = &args.markdown_output_dir {
        if let Err(e) = ensure_writable_dir(markdown_output_dir).await {
            error!(path = %markdown_output_dir, error = %e, "Markdown output directory is not writable");
        } else if let Err(e) = markdown::write_feed_markdown(&view, markdown_output_dir, generated_at).await {
            error!(error = %e, "Failed writing Markdown");
        } else if let Err(e) = indexes::update_feed_index(
            markdown_output_dir,
            &view,
            generated_at,
            &markdown::markdown_filename(generated_at),
        )
        .await
        {
            error!(error = %e, "Failed to update feeds.md index");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = view.items.len(),
        failed_providers = view.failures.len(),
        "Execution complete"
    );

    Ok(())
}
