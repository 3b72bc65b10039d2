//! Classification of directory entries by extension.
//!
//! | Extensions | Kind |
//! |---|---|
//! | `md`, `markdown` | [`FileKind::Document`] |
//! | `png`, `jpg`, `jpeg`, `svg`, `gif` | [`FileKind::Image`] |
//! | `js` | [`FileKind::Script`] |
//! | anything else | [`FileKind::Unrecognized`] |
//!
//! Matching is case-insensitive. Classification is total: every entry gets
//! a kind, and unrecognized files are simply reported and left alone.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "gif"];
const SCRIPT_EXTENSIONS: &[&str] = &["js"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Document,
    Image,
    Script,
    Unrecognized,
}

impl FileKind {
    pub fn label(self) -> &'static str {
        match self {
            FileKind::Document => "document",
            FileKind::Image => "image",
            FileKind::Script => "script",
            FileKind::Unrecognized => "unrecognized",
        }
    }
}

/// A classified file found during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// File stem (`banner` for `banner.gif`).
    pub name: String,
    /// Lowercased extension without the dot; empty when there is none.
    pub extension: String,
    pub absolute_path: PathBuf,
    pub kind: FileKind,
}

impl FileNode {
    /// The entry's full file name, stem plus original extension.
    pub fn file_name(&self) -> String {
        self.absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// What the walker should do with a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Descend into this directory.
    Directory(PathBuf),
    /// Dispatch a transform (or report) for this file.
    File(FileNode),
    /// Excluded directory, hidden entry or reserved file.
    Skipped,
}

/// Names pruned from the walk, plus reserved root-level file names.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    pub dir_names: BTreeSet<String>,
    /// Absolute paths never classified (config file, skeleton, output root).
    pub paths: BTreeSet<PathBuf>,
}

impl Exclusions {
    pub fn new(dir_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            dir_names: dir_names.into_iter().collect(),
            paths: BTreeSet::new(),
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.paths.insert(path);
        self
    }

    fn excludes_path(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Map a file extension to its kind.
pub fn kind_for_extension(extension: &str) -> FileKind {
    let ext = extension.to_ascii_lowercase();
    if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Document
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Image
    } else if SCRIPT_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Script
    } else {
        FileKind::Unrecognized
    }
}

/// Build a [`FileNode`] for a file path.
pub fn classify_file(path: &Path) -> FileNode {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    FileNode {
        kind: kind_for_extension(&extension),
        name,
        extension,
        absolute_path: path.to_path_buf(),
    }
}

/// Classify one directory entry.
///
/// `is_dir` is the filesystem's type hint for the entry (symlinks already
/// resolved by the caller).
pub fn classify_entry(path: &Path, is_dir: bool, exclusions: &Exclusions) -> Entry {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.starts_with('.') || exclusions.excludes_path(path) {
        return Entry::Skipped;
    }

    if is_dir {
        if exclusions.dir_names.contains(&name) {
            Entry::Skipped
        } else {
            Entry::Directory(path.to_path_buf())
        }
    } else {
        Entry::File(classify_file(path))
    }
}
