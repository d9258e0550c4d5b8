//! Markdown rendering of a feed snapshot.
//!
//! Articles are listed in feed order under a header summarizing the
//! filters. Providers that failed are called out at the end so a reader can
//! tell a short feed from a partial one.

use crate::controller::FeedView;
use crate::models::{NewsFilters, ProviderId};
use crate::utils::format_date;
use chrono::{DateTime, Local};
use itertools::Itertools;
use std::error::Error;
use std::fmt::{self, Write};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

fn describe_filters(filters: &NewsFilters) -> Vec<String> {
    let mut parts = vec![format!(
        "**Sources:** {}",
        filters
            .sources
            .iter()
            .map(|id| ProviderId::display_name(*id))
            .join(", ")
    )];
    if !filters.categories.is_empty() {
        parts.push(format!("**Categories:** {}", filters.categories.iter().join(", ")));
    }
    if let Some(query) = filters.search_query() {
        parts.push(format!("**Query:** {query}"));
    }
    if let Some(author) = filters.author() {
        parts.push(format!("**Author:** {author}"));
    }
    match (filters.date_from, filters.date_to) {
        (Some(from), Some(to)) => parts.push(format!("**Dates:** {} to {}", format_date(from), format_date(to))),
        (Some(from), None) => parts.push(format!("**From:** {}", format_date(from))),
        (None, Some(to)) => parts.push(format!("**Until:** {}", format_date(to))),
        (None, None) => {}
    }
    parts
}

fn render(md: &mut String, view: &FeedView, generated_at: DateTime<Local>) -> fmt::Result {
    writeln!(md, "# News feed, {}\n", generated_at.format("%Y-%m-%d %H:%M"))?;
    writeln!(md, "{}\n", describe_filters(&view.filters).join(" · "))?;

    if view.items.is_empty() {
        writeln!(md, "_No articles match these filters._\n")?;
    }

    for article in &view.items {
        let title = if article.title.is_empty() { "(untitled)" } else { article.title.as_str() };
        if article.url.is_empty() {
            writeln!(md, "## {title}\n")?;
        } else {
            writeln!(md, "## [{title}]({})\n", article.url)?;
        }

        let mut byline = vec![article.source.name.clone()];
        if let Some(author) = &article.author {
            byline.push(author.clone());
        }
        if !article.published_at.is_empty() {
            byline.push(article.published_at.clone());
        }
        writeln!(md, "*{}*\n", byline.join(" · "))?;

        if let Some(image) = &article.url_to_image {
            writeln!(md, "![]({image})\n")?;
        }
        if !article.description.is_empty() {
            writeln!(md, "{}\n", article.description)?;
        }
    }

    if !view.failures.is_empty() {
        writeln!(md, "---\n\n**Not loaded:**\n")?;
        for failure in &view.failures {
            writeln!(md, "- {}: {}", failure.provider.display_name(), failure.error)?;
        }
        writeln!(md)?;
    }

    if view.has_more {
        writeln!(md, "_More articles are available._")?;
    } else {
        writeln!(md, "_End of feed._")?;
    }
    Ok(())
}

/// Render `view` as a Markdown document.
pub fn feed_to_markdown(view: &FeedView, generated_at: DateTime<Local>) -> Result<String, fmt::Error> {
    let mut md = String::new();
    render(&mut md, view, generated_at)?;
    Ok(md)
}

/// File name of the Markdown snapshot taken at `generated_at`.
pub fn markdown_filename(generated_at: DateTime<Local>) -> String {
    format!("{}_feed-{}.md", generated_at.date_naive(), generated_at.format("%H%M%S"))
}

/// Write `view` to `{markdown_output_dir}/{date}_feed-{HHMMSS}.md`.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir, items = view.items.len()))]
pub async fn write_feed_markdown(
    view: &FeedView,
    markdown_output_dir: &str,
    generated_at: DateTime<Local>,
) -> Result<PathBuf, Box<dyn Error>> {
    let markdown = feed_to_markdown(view, generated_at)?;
    fs::create_dir_all(markdown_output_dir).await?;
    let path = PathBuf::from(markdown_output_dir).join(markdown_filename(generated_at));
    fs::write(&path, markdown).await?;
    info!(path = %path.display(), "Wrote Markdown feed");
    Ok(path)
}
