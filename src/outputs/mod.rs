//! Writers for settled feed snapshots.
//!
//! # Submodules
//!
//! - [`json`]: the full snapshot as JSON, for other programs
//! - [`markdown`]: a readable rendering of the snapshot
//! - [`indexes`]: the `feeds.md` index linking every Markdown snapshot
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── feed-081502.json
//!
//! markdown_output_dir/
//! ├── 2025-05-06_feed-081502.md
//! └── feeds.md
//! ```

pub mod indexes;
pub mod json;
pub mod markdown;
