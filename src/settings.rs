//! Remembered feed filters.
//!
//! The last filters a reader chose are kept in a small YAML file so the next
//! session starts where the previous one left off. Only the filter selection
//! is remembered; the page cursor and page size are not.
//!
//! ```yaml
//! filters:
//!   sources: [guardian, news-api]
//!   categories: [technology]
//!   searchQuery: rust
//! ```

use crate::models::{FilterPatch, NewsFilters};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default)]
    pub filters: FilterPatch,
}

impl FeedSettings {
    /// Overwrite the remembered fields that `patch` sets.
    pub fn merge(&mut self, mut patch: FilterPatch) {
        patch.page_size = None;
        self.filters.merge(patch);
    }

    /// Remember everything `filters` selects.
    pub fn remember(&mut self, filters: &NewsFilters) {
        self.merge(FilterPatch::from(filters));
    }

    /// Load settings from `path`. A missing file yields empty settings.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let yaml = match tokio::fs::read_to_string(path.as_ref()).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No remembered filters yet");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let settings: Self = serde_yaml::from_str(&yaml)?;
        info!(empty = settings.filters.is_empty(), "Loaded remembered filters");
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories as needed.
    ///
    /// Blocking, so it can run from a filter-change callback.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        debug!(path = %path.display(), "Saved remembered filters");
        Ok(())
    }
}
