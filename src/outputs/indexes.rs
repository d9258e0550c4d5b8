//! Index of Markdown feed snapshots.
//!
//! `feeds.md` in the Markdown output directory lists every snapshot, newest
//! date first, with the snapshots of one date in the order they were taken:
//!
//! ```text
//! # Feed Index
//!
//! - **2025-05-06**
//!     - [08:15:02](./2025-05-06_feed-081502.md): 30 articles
//!     - [17:30:10](./2025-05-06_feed-173010.md): 12 articles, query "mars"
//! ```

use crate::controller::FeedView;
use chrono::{DateTime, Local};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const INDEX_FILE: &str = "feeds.md";
const INDEX_HEADING: &str = "# Feed Index";

fn entry_line(view: &FeedView, generated_at: DateTime<Local>, markdown_filename: &str) -> String {
    let mut line = format!(
        "    - [{}](./{}): {} articles",
        generated_at.format("%H:%M:%S"),
        markdown_filename,
        view.items.len()
    );
    if let Some(query) = view.filters.search_query() {
        line.push_str(&format!(", query \"{query}\""));
    }
    if !view.failures.is_empty() {
        line.push_str(&format!(", {} provider(s) failed", view.failures.len()));
    }
    line
}

/// Insert `entry` under the heading of `date`, creating the heading when
/// the date is new. Re-adding an existing entry is a no-op.
fn insert_entry(content: &str, date_heading: &str, entry: &str) -> String {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    if let Some(pos) = lines.iter().position(|l| l.trim() == date_heading) {
        let mut end = pos + 1;
        while end < lines.len() && lines[end].starts_with("    - ") {
            if lines[end] == entry {
                return lines.join("\n") + "\n";
            }
            end += 1;
        }
        lines.insert(end, entry.to_string());
    } else {
        let insert_at = lines
            .iter()
            .position(|l| l.starts_with(INDEX_HEADING))
            .map(|pos| pos + 1)
            .unwrap_or(lines.len());
        lines.splice(
            insert_at..insert_at,
            ["".to_string(), date_heading.to_string(), entry.to_string()],
        );
    }

    lines.join("\n") + "\n"
}

/// Record a Markdown snapshot in `{markdown_output_dir}/feeds.md`.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir, file = %markdown_filename))]
pub async fn update_feed_index(
    markdown_output_dir: &str,
    view: &FeedView,
    generated_at: DateTime<Local>,
    markdown_filename: &str,
) -> Result<(), Box<dyn Error>> {
    let index_path = Path::new(markdown_output_dir).join(INDEX_FILE);
    let content = if index_path.exists() {
        fs::read_to_string(&index_path).await?
    } else {
        format!("{INDEX_HEADING}\n")
    };

    let date_heading = format!("- **{}**", generated_at.date_naive());
    let updated = insert_entry(
        &content,
        &date_heading,
        &entry_line(view, generated_at, markdown_filename),
    );

    fs::write(&index_path, updated).await?;
    info!(path = %index_path.display(), "Updated feed index");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_new_dates_at_top() {
        let first = insert_entry("# Feed Index\n", "- **2025-05-05**", "    - [a](./a.md): 1 articles");
        let second = insert_entry(&first, "- **2025-05-06**", "    - [b](./b.md): 2 articles");
        assert_eq!(
            second,
            "# Feed Index\n\n- **2025-05-06**\n    - [b](./b.md): 2 articles\n\n- **2025-05-05**\n    - [a](./a.md): 1 articles\n"
        );
    }

    #[test]
    fn test_insert_same_date_appends_once() {
        let base = insert_entry("# Feed Index\n", "- **2025-05-06**", "    - [a](./a.md): 1 articles");
        let more = insert_entry(&base, "- **2025-05-06**", "    - [b](./b.md): 2 articles");
        let again = insert_entry(&more, "- **2025-05-06**", "    - [b](./b.md): 2 articles");
        assert_eq!(
            again,
            "# Feed Index\n\n- **2025-05-06**\n    - [a](./a.md): 1 articles\n    - [b](./b.md): 2 articles\n"
        );
    }
}
