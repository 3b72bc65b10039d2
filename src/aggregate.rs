//! Index page generation from collected document metadata.
//!
//! Runs once, after every transform has finished. The [`BuildManifest`]
//! holds one [`DocumentMetadata`] per rendered document; only complete
//! records make it onto the index, newest first:
//!
//! ```text
//! <article class="preview">
//!   <h2><a href="post-a/">Post A</a></h2>
//!   <p><time datetime="2024-02-01">February 1, 2024</time></p>
//!   <p class="description">About A</p>
//! </article>
//! ```

use crate::dates;
use crate::hydrate::PageSkeleton;
use crate::paths::{page_link, rewrite_root_links};
use crate::types::DocumentMetadata;
use maud::{Markup, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the generated index at the output root.
pub const INDEX_PAGE: &str = "index.html";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("cannot write index {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// All document metadata of one build. In memory only.
#[derive(Debug, Clone, Default)]
pub struct BuildManifest {
    entries: Vec<DocumentMetadata>,
}

impl BuildManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metadata: DocumentMetadata) {
        self.entries.push(metadata);
    }

    /// Complete records in index order: date descending, ties in discovery
    /// order.
    pub fn index_entries(&self) -> Vec<&DocumentMetadata> {
        let mut entries: Vec<&DocumentMetadata> =
            self.entries.iter().filter(|m| m.is_complete()).collect();
        entries.sort_by_key(|m| m.sequence);
        entries.sort_by(|a, b| {
            dates::newest_first(
                a.date.as_deref().unwrap_or_default(),
                b.date.as_deref().unwrap_or_default(),
            )
        });
        entries
    }

    /// Records left off the index, in discovery order.
    pub fn excluded(&self) -> Vec<&DocumentMetadata> {
        let mut entries: Vec<&DocumentMetadata> =
            self.entries.iter().filter(|m| !m.is_complete()).collect();
        entries.sort_by_key(|m| m.sequence);
        entries
    }
}

/// Preview block for one complete record.
fn preview_block(metadata: &DocumentMetadata) -> Markup {
    let title = metadata.title.as_deref().unwrap_or_default();
    let description = metadata.description.as_deref().unwrap_or_default();
    let date = metadata.date.as_deref().unwrap_or_default();
    html! {
        article.preview {
            h2 { a href=(page_link("", &metadata.output_path)) { (title) } }
            p {
                @if let Some(parsed) = dates::parse_date(date) {
                    time datetime=(parsed.format("%Y-%m-%d").to_string()) {
                        (dates::format_date(date))
                    }
                } @else {
                    (date)
                }
            }
            p.description { (description) }
        }
    }
}

/// The full index document.
pub fn render_index(manifest: &BuildManifest, skeleton: &PageSkeleton) -> String {
    let previews = html! {
        @for metadata in manifest.index_entries() {
            (preview_block(metadata))
        }
    };
    rewrite_root_links(&skeleton.hydrate(&previews.into_string()), 0)
}

/// Render and write `index.html` at the output root.
pub fn write_index(
    manifest: &BuildManifest,
    skeleton: &PageSkeleton,
    output_root: &Path,
) -> Result<PathBuf, AggregateError> {
    let path = output_root.join(INDEX_PAGE);
    fs::write(&path, render_index(manifest, skeleton)).map_err(|source| AggregateError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
