//! Shared test utilities for the treepress test suite.
//!
//! Provides scratch-tree writers and a bundle of mock collaborators that
//! can hand out a [`TransformContext`] for unit tests of the walker and
//! the transforms.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(&tmp.path().join("src/post/index.md"), "# Hi");
//!
//! let collaborators = TestCollaborators::new().with_layout(Layout::Flat);
//! let ctx = collaborators.context(&tmp.path().join("out"));
//! // ... run a transform, then inspect collaborators.images / .bundler
//! ```

use std::path::Path;

use crate::bundle::BundleOptions;
use crate::bundle::tests::MockBundler;
use crate::config::Layout;
use crate::hydrate::PageSkeleton;
use crate::imaging::backend::tests::MockBackend;
use crate::render::MarkdownRenderer;
use crate::transform::TransformContext;

// =========================================================================
// Scratch trees
// =========================================================================

/// Write a text file, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) {
    write_bytes(path, content.as_bytes());
}

/// Write a binary file, creating parent directories as needed.
pub fn write_bytes(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

// =========================================================================
// Collaborators
// =========================================================================

/// Real markdown renderer, mock resizer and bundler, built-in skeleton.
pub struct TestCollaborators {
    pub renderer: MarkdownRenderer,
    pub images: MockBackend,
    pub bundler: MockBundler,
    pub skeleton: PageSkeleton,
    pub layout: Layout,
    pub max_image_width: u32,
}

impl TestCollaborators {
    pub fn new() -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
            images: MockBackend::new(),
            bundler: MockBundler::new(),
            skeleton: PageSkeleton::builtin("content").unwrap(),
            layout: Layout::NestedIndex,
            max_image_width: 600,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_image_width(mut self, width: u32) -> Self {
        self.max_image_width = width;
        self
    }

    pub fn with_images(mut self, images: MockBackend) -> Self {
        self.images = images;
        self
    }

    pub fn context<'a>(&'a self, output_root: &'a Path) -> TransformContext<'a> {
        TransformContext {
            output_root,
            layout: self.layout,
            max_image_width: self.max_image_width,
            skeleton: &self.skeleton,
            renderer: &self.renderer,
            images: &self.images,
            bundler: &self.bundler,
            bundle_options: BundleOptions::default(),
        }
    }
}
