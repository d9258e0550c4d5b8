//! JSON snapshot output.
//!
//! A settled [`FeedView`] is written as one JSON document per run, grouped
//! by local date:
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── feed-081502.json
//!     └── feed-173010.json
//! ```

use crate::controller::FeedView;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// The document written to disk: the snapshot plus when it was taken.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument<'a> {
    pub generated_at: String,
    pub article_count: usize,
    #[serde(flatten)]
    pub view: &'a FeedView,
}

impl<'a> FeedDocument<'a> {
    pub fn new(view: &'a FeedView, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at: generated_at.to_rfc3339(),
            article_count: view.items.len(),
            view,
        }
    }
}

/// File name of the snapshot taken at `generated_at`.
pub fn feed_filename(generated_at: DateTime<Local>) -> String {
    format!("feed-{}.json", generated_at.format("%H%M%S"))
}

/// Write `view` to `{json_output_dir}/{date}/feed-{HHMMSS}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, items = view.items.len()))]
pub async fn write_feed(
    view: &FeedView,
    json_output_dir: &str,
    generated_at: DateTime<Local>,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(&FeedDocument::new(view, generated_at))?;

    let full_json_dir = PathBuf::from(json_output_dir).join(generated_at.date_naive().to_string());
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(feed_filename(generated_at));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON feed snapshot");
    Ok(path)
}
