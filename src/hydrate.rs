//! Page skeleton loading and hydration.
//!
//! The skeleton is the shared HTML shell every page is poured into. It is
//! loaded once per build and kept as immutable text; hydrating a page is a
//! pure substitution that returns a new `String`, so any number of
//! transforms can hydrate concurrently from a shared `&PageSkeleton`.
//!
//! The insertion point is the element whose `id` attribute matches the
//! configured id. Its existing children are replaced; its own tag and
//! attributes are kept:
//!
//! ```text
//! <main id="content"><p>placeholder</p></main>
//!                   ^^^^^^^^^^^^^^^^^^ replaced
//! ```

use maud::{DOCTYPE, Markup, html};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkeletonError {
    #[error("cannot read skeleton {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("skeleton has no element with id=\"{0}\"")]
    MissingInsertionPoint(String),
    #[error("element with id=\"{0}\" is never closed")]
    UnclosedInsertionPoint(String),
}

/// The shared page shell with a resolved insertion point.
#[derive(Debug, Clone)]
pub struct PageSkeleton {
    source: String,
    /// Byte range of the insertion element's inner HTML.
    slot: Range<usize>,
}

impl PageSkeleton {
    /// Parse skeleton text, locating the element with `id="{insertion_id}"`.
    pub fn parse(source: impl Into<String>, insertion_id: &str) -> Result<Self, SkeletonError> {
        let source = source.into();
        let slot = find_slot(&source, insertion_id)?;
        Ok(Self { source, slot })
    }

    /// Read and parse a skeleton file.
    pub fn load(path: &Path, insertion_id: &str) -> Result<Self, SkeletonError> {
        let source = fs::read_to_string(path).map_err(|source| SkeletonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(source, insertion_id)
    }

    /// The built-in shell used when the content tree provides none.
    ///
    /// Fails for an id that HTML escaping changes, since the rendered
    /// attribute no longer matches it.
    pub fn builtin(insertion_id: &str) -> Result<Self, SkeletonError> {
        Self::parse(default_shell(insertion_id).into_string(), insertion_id)
    }

    /// Return the full document with `content` as the insertion point's
    /// inner HTML.
    pub fn hydrate(&self, content: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + content.len());
        out.push_str(&self.source[..self.slot.start]);
        out.push_str(content);
        out.push_str(&self.source[self.slot.end..]);
        out
    }
}

fn default_shell(insertion_id: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "treepress" }
            }
            body {
                header.site-header {
                    a href="/" { "Home" }
                }
                main id=(insertion_id) {}
            }
        }
    }
}

/// Find the inner range of the element carrying the given id.
fn find_slot(source: &str, id: &str) -> Result<Range<usize>, SkeletonError> {
    let (tag_start, tag_end) = find_tag_with_id(source, id)
        .ok_or_else(|| SkeletonError::MissingInsertionPoint(id.to_string()))?;
    let open_tag = &source[tag_start..tag_end];
    let name = tag_name(open_tag);

    if open_tag.trim_end_matches('>').trim_end().ends_with('/') {
        // Self-closing tags have no room for content.
        return Err(SkeletonError::UnclosedInsertionPoint(id.to_string()));
    }

    let close_start = find_matching_close(source, tag_end, &name)
        .ok_or_else(|| SkeletonError::UnclosedInsertionPoint(id.to_string()))?;
    Ok(tag_end..close_start)
}

/// Locate the opening tag containing `id="…"` (either quote style).
/// Returns the byte offsets of `<` and one past `>`.
fn find_tag_with_id(source: &str, id: &str) -> Option<(usize, usize)> {
    let needles = [format!("id=\"{id}\""), format!("id='{id}'")];
    let mut search_from = 0;
    loop {
        let found = needles
            .iter()
            .filter_map(|n| source[search_from..].find(n.as_str()))
            .min()?;
        let at = search_from + found;
        let tag_start = source[..at].rfind('<')?;
        let preceding = source[..at].chars().next_back();
        let inside_tag = !source[tag_start..at].contains('>');
        // Reject matches like `data-id="content"`.
        let standalone = preceding.is_some_and(|c| c.is_whitespace());
        if inside_tag && standalone {
            let tag_end = at + source[at..].find('>')? + 1;
            return Some((tag_start, tag_end));
        }
        search_from = at + 1;
    }
}

fn tag_name(open_tag: &str) -> String {
    open_tag
        .trim_start_matches('<')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Scan forward from `from` for the close tag that balances an already
/// open `<name>`, counting nested elements of the same name.
fn find_matching_close(source: &str, from: usize, name: &str) -> Option<usize> {
    let lower = source.to_ascii_lowercase();
    let open = format!("<{name}");
    let close = format!("</{name}");
    let mut depth = 1usize;
    let mut pos = from;

    while pos < lower.len() {
        let next_open = lower[pos..].find(&open).map(|p| p + pos);
        let next_close = lower[pos..].find(&close).map(|p| p + pos)?;

        match next_open {
            Some(o) if o < next_close && is_tag_boundary(&lower, o + open.len()) => {
                depth += 1;
                pos = o + open.len();
            }
            Some(o) if o < next_close => {
                pos = o + open.len();
            }
            _ => {
                if is_tag_boundary(&lower, next_close + close.len()) {
                    depth -= 1;
                    if depth == 0 {
                        return Some(next_close);
                    }
                }
                pos = next_close + close.len();
            }
        }
    }
    None
}

/// True when the byte at `at` ends a tag name (`<div>` vs `<divider>`).
fn is_tag_boundary(source: &str, at: usize) -> bool {
    source[at..]
        .chars()
        .next()
        .is_none_or(|c| c == '>' || c == '/' || c.is_whitespace())
}
