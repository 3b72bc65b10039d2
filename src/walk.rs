//! Recursive traversal of the source tree.
//!
//! The walk itself is sequential and deterministic: entries are visited in
//! sorted name order and every dispatched file gets the next sequence
//! number. Each directory's mirrored destination is created before any of
//! its entries are looked at, so a transform spawned for a file can always
//! write into its directory.
//!
//! File transforms are spawned onto the surrounding [`rayon::Scope`] and
//! run while the walk continues. Every result, and every notice the walk
//! itself produces, is sent as a [`WalkMessage`] over one channel; the
//! scope's end is the join barrier.
//!
//! A directory that cannot be read or mirrored is reported and skipped
//! together with everything below it. Its siblings are unaffected.

use crate::classify::{Entry, Exclusions, FileKind, FileNode, classify_entry};
use crate::transform::{self, Outcome, TransformContext, TransformError};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot create output directory {path}: {source}")]
    Mirror {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("directory {0} was already visited through a symlink")]
    Cycle(PathBuf),
}

/// A source directory and its mirror in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMapping {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// Path below the source root, `/`-separated; empty for the root.
    pub relative: String,
    /// Number of components in `relative`.
    pub depth: usize,
}

impl DirectoryMapping {
    pub fn root(source_root: &Path, output_root: &Path) -> Self {
        Self {
            source_path: source_root.to_path_buf(),
            destination_path: output_root.to_path_buf(),
            relative: String::new(),
            depth: 0,
        }
    }

    /// Mapping for the subdirectory `name`.
    pub fn child(&self, name: &str) -> Self {
        Self {
            source_path: self.source_path.join(name),
            destination_path: self.destination_path.join(name),
            relative: self.relative_join(name),
            depth: self.depth + 1,
        }
    }

    /// Mirrored destination of a file in this directory.
    pub fn destination_for(&self, file_name: &str) -> PathBuf {
        self.destination_path.join(file_name)
    }

    /// Root-relative form of a path inside this directory.
    pub fn relative_join(&self, name: &str) -> String {
        if self.relative.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.relative, name)
        }
    }
}

/// Everything the walk reports back to the build.
#[derive(Debug)]
pub enum WalkMessage {
    /// A directory was mirrored and its entries are being dispatched.
    Directory { relative: String },
    /// A file with no transform; reported and left alone.
    Unrecognized { path: PathBuf },
    /// A directory and everything below it was skipped.
    SubtreeFailed { path: PathBuf, error: WalkError },
    /// One file transform finished.
    Transformed {
        node: FileNode,
        result: Result<Outcome, TransformError>,
    },
}

/// Shared, read-only inputs of a walk.
pub struct Walker<'a> {
    pub exclusions: &'a Exclusions,
    pub context: &'a TransformContext<'a>,
    pub messages: Sender<WalkMessage>,
}

/// Mutable bookkeeping threaded through the sequential part of the walk.
#[derive(Debug, Default)]
pub struct WalkState {
    next_sequence: usize,
    visited: HashSet<PathBuf>,
    /// Root-relative output file → the source that claimed it first.
    claimed: HashMap<String, PathBuf>,
}

impl WalkState {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&mut self) -> usize {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// Reserve `output` for `source`. On a conflict, returns the source
    /// that holds it.
    fn claim(&mut self, output: String, source: &Path) -> Result<(), PathBuf> {
        match self.claimed.get(&output) {
            Some(holder) => Err(holder.clone()),
            None => {
                self.claimed.insert(output, source.to_path_buf());
                Ok(())
            }
        }
    }
}

impl Walker<'_> {
    fn send(&self, message: WalkMessage) {
        self.messages.send(message).ok();
    }
}

/// Walk `dir` and everything below it, spawning file transforms on `scope`.
pub fn walk_directory<'s>(
    scope: &rayon::Scope<'s>,
    walker: &'s Walker<'s>,
    dir: DirectoryMapping,
    state: &mut WalkState,
) {
    if let Ok(canonical) = fs::canonicalize(&dir.source_path) {
        if !state.visited.insert(canonical) {
            walker.send(WalkMessage::SubtreeFailed {
                error: WalkError::Cycle(dir.source_path.clone()),
                path: dir.source_path,
            });
            return;
        }
    }

    if let Err(source) = fs::create_dir_all(&dir.destination_path) {
        walker.send(WalkMessage::SubtreeFailed {
            error: WalkError::Mirror {
                path: dir.destination_path.clone(),
                source,
            },
            path: dir.source_path,
        });
        return;
    }

    let entries = match read_sorted(&dir.source_path) {
        Ok(entries) => entries,
        Err(source) => {
            walker.send(WalkMessage::SubtreeFailed {
                error: WalkError::ReadDir {
                    path: dir.source_path.clone(),
                    source,
                },
                path: dir.source_path,
            });
            return;
        }
    };

    walker.send(WalkMessage::Directory {
        relative: dir.relative.clone(),
    });

    for (path, is_dir) in entries {
        match classify_entry(&path, is_dir, walker.exclusions) {
            Entry::Skipped => {}
            Entry::Directory(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                walk_directory(scope, walker, dir.child(&name), state);
            }
            Entry::File(node) if node.kind == FileKind::Unrecognized => {
                walker.send(WalkMessage::Unrecognized {
                    path: node.absolute_path,
                });
            }
            Entry::File(node) => {
                let planned = transform::planned_output(&node, &dir, walker.context.layout);
                if let Some(output) = planned {
                    if let Err(claimed_by) = state.claim(output.clone(), &node.absolute_path) {
                        walker.send(WalkMessage::Transformed {
                            node,
                            result: Err(TransformError::OutputCollision { output, claimed_by }),
                        });
                        continue;
                    }
                }
                let sequence = state.next_sequence();
                let mapping = dir.clone();
                scope.spawn(move |_| {
                    let result = transform::run(&node, &mapping, sequence, walker.context);
                    walker.send(WalkMessage::Transformed { node, result });
                });
            }
        }
    }
}

/// Directory entries as `(path, is_dir)`, sorted by file name.
///
/// Symlinks are followed; an entry whose target cannot be inspected is
/// treated as a file so its transform reports the problem.
fn read_sorted(dir: &Path) -> std::io::Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_dir = fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
        entries.push((path, is_dir));
    }
    entries.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(entries)
}
