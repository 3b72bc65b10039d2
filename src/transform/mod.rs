//! Per-file transforms.
//!
//! [`run`] dispatches a classified file to the transform for its kind:
//!
//! | Kind | Transform | Output |
//! |---|---|---|
//! | Document | [`document`] | hydrated HTML page + [`DocumentMetadata`] |
//! | Image | [`image`] | resized (or copied) image at the mirrored path |
//! | Script | [`script`] | bundle in the mirrored directory |
//!
//! Transforms are independent of each other and only read from the shared
//! [`TransformContext`]. A failure is scoped to the one file: it comes back
//! as a [`TransformError`] and the build carries on.

pub mod document;
pub mod image;
pub mod script;

use crate::bundle::{BundleError, BundleOptions, Bundler};
use crate::classify::{FileKind, FileNode};
use crate::config::Layout;
use crate::hydrate::PageSkeleton;
use crate::imaging::{BackendError, ImageBackend};
use crate::render::{RenderError, Renderer};
use crate::types::DocumentMetadata;
use crate::walk::DirectoryMapping;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("resize failed: {0}")]
    Resize(#[from] BackendError),
    #[error("bundle failed: {0}")]
    Bundle(#[from] BundleError),
    #[error("page would overwrite the generated index at {0}")]
    IndexCollision(String),
    #[error("{output} is already produced by {claimed_by}")]
    OutputCollision { output: String, claimed_by: PathBuf },
}

/// Read-only inputs shared by every transform in a build.
pub struct TransformContext<'a> {
    pub output_root: &'a Path,
    pub layout: Layout,
    pub max_image_width: u32,
    pub skeleton: &'a PageSkeleton,
    pub renderer: &'a dyn Renderer,
    pub images: &'a dyn ImageBackend,
    pub bundler: &'a dyn Bundler,
    pub bundle_options: BundleOptions,
}

/// How an image reached the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAction {
    /// Vector image, copied verbatim.
    Copied,
    /// Raster image passed through the resizer.
    Resized,
}

/// What a successful transform produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Page {
        output: PathBuf,
        metadata: DocumentMetadata,
    },
    Image {
        output: PathBuf,
        action: ImageAction,
    },
    Script {
        output_dir: PathBuf,
    },
    /// No transform applies.
    Ignored,
}

/// Run the transform for `node`, a file inside `dir`.
///
/// `sequence` is the walker's discovery number for the file and is carried
/// into document metadata.
pub fn run(
    node: &FileNode,
    dir: &DirectoryMapping,
    sequence: usize,
    ctx: &TransformContext,
) -> Result<Outcome, TransformError> {
    match node.kind {
        FileKind::Document => document::transform(node, dir, sequence, ctx),
        FileKind::Image => image::transform(node, dir, ctx),
        FileKind::Script => script::transform(node, dir, ctx),
        FileKind::Unrecognized => Ok(Outcome::Ignored),
    }
}

/// Root-relative file a transform for `node` will write, when it writes a
/// single known file. Scripts leave naming to the bundler.
pub fn planned_output(node: &FileNode, dir: &DirectoryMapping, layout: Layout) -> Option<String> {
    match node.kind {
        FileKind::Document => Some(document::page_output_path(&dir.relative, &node.name, layout)),
        FileKind::Image => Some(dir.relative_join(&node.file_name())),
        FileKind::Script | FileKind::Unrecognized => None,
    }
}

fn read_error(path: &Path) -> impl FnOnce(std::io::Error) -> TransformError + '_ {
    move |source| TransformError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> TransformError + '_ {
    move |source| TransformError::Write {
        path: path.to_path_buf(),
        source,
    }
}
