//! # treepress
//!
//! Turns a directory tree of mixed content (markdown documents with YAML
//! frontmatter, images, scripts) into a mirrored tree of publishable files
//! plus a generated `index.html` that previews every document.
//!
//! # Architecture: Walk, Transform, Aggregate
//!
//! ```text
//! 1. Walk       content/   →  mirrored directories + one task per file
//! 2. Transform  each file  →  page / resized image / bundle   (in parallel)
//! 3. Aggregate  metadata   →  dist/index.html                 (after all tasks)
//! ```
//!
//! The walk is sequential and sorted, so discovery order is stable; the
//! transforms run on a rayon scope, and the end of that scope is the only
//! synchronisation point before the index is written. Nothing is persisted
//! between builds.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | The `build` operation: setup, join barrier, index, report |
//! | [`walk`] | Recursive traversal and directory mirroring |
//! | [`classify`] | Extension → file kind, exclusions |
//! | [`transform`] | Document, image and script transforms |
//! | [`aggregate`] | `BuildManifest` and index page rendering |
//! | [`hydrate`] | Page skeleton loading and content injection |
//! | [`render`] | Markdown + frontmatter renderer |
//! | [`imaging`] | Resize backend (`image` crate) and dimension math |
//! | [`bundle`] | Script bundler trait and external-command bundler |
//! | [`paths`] | Relative links between locations in the output tree |
//! | [`dates`] | Frontmatter date parsing, display and ordering |
//! | [`config`] | `treepress.toml` loading, merging and validation |
//! | [`types`] | `DocumentMetadata` shared by transforms and aggregation |
//! | [`output`] | CLI output formatting for events and the summary |
//!
//! # Design Decisions
//!
//! ## Relative Links Everywhere
//!
//! Generated pages never contain root-absolute URLs. Root-relative links in
//! the skeleton (`href="/"`) are rewritten for each page's depth, so the
//! output works from any sub-path and straight from disk.
//!
//! ## Collaborators Behind Traits
//!
//! Rendering, resizing and bundling are traits ([`render::Renderer`],
//! [`imaging::ImageBackend`], [`bundle::Bundler`]) with one production
//! implementation each. Tests run the whole pipeline against mocks that
//! record their calls.
//!
//! ## Failures Stay Local
//!
//! Only setup problems (missing source, bad config, unusable skeleton) and
//! the final index write abort a build. A directory that cannot be read
//! skips its subtree; a file that cannot be transformed skips itself. Both
//! are reported and the exit code stays 0.

pub mod aggregate;
pub mod bundle;
pub mod classify;
pub mod config;
pub mod dates;
pub mod hydrate;
pub mod imaging;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod render;
pub mod transform;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
