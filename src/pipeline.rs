//! The top-level build.
//!
//! ```text
//! source root ──walk──▶ transforms (rayon scope) ──messages──▶ collector
//!                                                                │
//!                               join barrier (scope end) ◀───────┘
//!                                        │
//!                                        ▼
//!                           index.html from the BuildManifest
//! ```
//!
//! [`build`] wires the production collaborators; [`build_with`] takes any
//! [`Collaborators`] so tests can substitute mocks. Only setup problems and
//! the final index write are fatal ([`BuildError`]). Everything that goes
//! wrong inside the tree lands in the [`BuildReport`] and, when a channel
//! is supplied, as a [`BuildEvent`] while the build is still running.

use crate::aggregate::{self, AggregateError, BuildManifest};
use crate::bundle::{BundleOptions, Bundler, CommandBundler};
use crate::classify::{Exclusions, FileKind};
use crate::config::{BuildConfig, CONFIG_FILE, ConfigError, DEFAULT_SKELETON_FILE};
use crate::hydrate::{PageSkeleton, SkeletonError};
use crate::imaging::{ImageBackend, RustBackend};
use crate::paths::to_url_path;
use crate::render::{MarkdownRenderer, Renderer};
use crate::transform::{ImageAction, Outcome, TransformContext};
use crate::walk::{DirectoryMapping, WalkMessage, WalkState, Walker, walk_directory};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("source root {path} is not readable: {source}")]
    SourceRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("source root {0} is not a directory")]
    SourceNotDirectory(PathBuf),
    #[error("cannot create output root {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("output root must differ from the source root: {0}")]
    SameRoots(PathBuf),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Skeleton error: {0}")]
    Skeleton(#[from] SkeletonError),
    #[error("Index error: {0}")]
    Index(#[from] AggregateError),
}

/// Where to read from and where to write to.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
}

/// External collaborators used by the transforms.
pub struct Collaborators<'a> {
    pub renderer: &'a dyn Renderer,
    pub images: &'a dyn ImageBackend,
    pub bundler: &'a dyn Bundler,
}

/// Progress reported while a build runs.
///
/// Source paths are relative to the source root and output paths relative
/// to the output root, both `/`-separated.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    Started {
        source: PathBuf,
        output: PathBuf,
    },
    DirectoryMirrored {
        relative: String,
    },
    PageWritten {
        source: String,
        output: String,
        /// Complete metadata, so the page will be on the index.
        listed: bool,
    },
    ImageWritten {
        source: String,
        output: String,
        action: ImageAction,
    },
    ScriptBundled {
        source: String,
        output_dir: String,
    },
    Unrecognized {
        source: String,
    },
    SubtreeSkipped {
        source: String,
        error: String,
    },
    TransformFailed {
        source: String,
        kind: FileKind,
        error: String,
    },
    IndexWritten {
        output: String,
        entries: usize,
    },
}

/// Whether a failure took out a whole directory or one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureScope {
    Subtree,
    Transform,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Failure {
    pub source: String,
    pub scope: FailureScope,
    pub message: String,
}

/// A rendered page that is not listed on the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedDocument {
    pub output: String,
    pub missing: Vec<&'static str>,
}

/// Everything a finished build produced or skipped. All lists are sorted
/// by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub directories: Vec<String>,
    pub pages: Vec<String>,
    pub images: Vec<String>,
    pub scripts: Vec<String>,
    pub unrecognized: Vec<String>,
    pub failures: Vec<Failure>,
    pub excluded_from_index: Vec<ExcludedDocument>,
    pub indexed: usize,
    pub index_path: PathBuf,
}

impl BuildReport {
    pub fn failures_in(&self, scope: FailureScope) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.scope == scope)
    }
}

/// Build with the production collaborators.
pub fn build(
    config: &BuildConfig,
    paths: &BuildPaths,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    let renderer = MarkdownRenderer::new();
    let images = RustBackend::new();
    let bundler = CommandBundler::from_config(&config.bundler);
    let collaborators = Collaborators {
        renderer: &renderer,
        images: &images,
        bundler: &bundler,
    };
    build_with(config, paths, &collaborators, events)
}

/// Build with explicit collaborators.
pub fn build_with(
    config: &BuildConfig,
    paths: &BuildPaths,
    collaborators: &Collaborators,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    config.validate()?;
    let source_root = resolve_source_root(&paths.source_root)?;
    let output_root = prepare_output_root(&paths.output_root)?;
    if source_root == output_root {
        return Err(BuildError::SameRoots(output_root));
    }

    let skeleton_path = locate_skeleton(config, &source_root);
    let skeleton = match &skeleton_path {
        Some(path) => PageSkeleton::load(path, &config.insertion_id)?,
        None => PageSkeleton::builtin(&config.insertion_id)?,
    };

    let mut exclusions = Exclusions::new(config.excluded_dirs.iter().cloned())
        .with_path(source_root.join(CONFIG_FILE))
        .with_path(output_root.clone());
    if let Some(path) = skeleton_path {
        exclusions = exclusions.with_path(fs::canonicalize(&path).unwrap_or(path));
    }

    if let Some(tx) = &events {
        tx.send(BuildEvent::Started {
            source: source_root.clone(),
            output: output_root.clone(),
        })
        .ok();
    }

    let context = TransformContext {
        output_root: &output_root,
        layout: config.layout,
        max_image_width: config.max_image_width,
        skeleton: &skeleton,
        renderer: collaborators.renderer,
        images: collaborators.images,
        bundler: collaborators.bundler,
        bundle_options: BundleOptions::default(),
    };

    let (tx, rx) = mpsc::channel();
    let walker = Walker {
        exclusions: &exclusions,
        context: &context,
        messages: tx,
    };
    let roots = Roots {
        source: &source_root,
        output: &output_root,
    };

    let (manifest, mut report) = thread::scope(|threads| {
        let collector = threads.spawn(|| collect(rx, roots, events.as_ref()));

        let mut state = WalkState::new();
        rayon::scope(|scope| {
            walk_directory(
                scope,
                &walker,
                DirectoryMapping::root(&source_root, &output_root),
                &mut state,
            );
        });
        // Closing the last sender ends the collector.
        drop(walker);

        collector
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    });

    report.index_path = aggregate::write_index(&manifest, &skeleton, &output_root)?;
    report.indexed = manifest.index_entries().len();
    report.excluded_from_index = manifest
        .excluded()
        .into_iter()
        .map(|m| ExcludedDocument {
            output: m.output_path.clone(),
            missing: m.missing_fields(),
        })
        .collect();

    if let Some(tx) = &events {
        tx.send(BuildEvent::IndexWritten {
            output: aggregate::INDEX_PAGE.to_string(),
            entries: report.indexed,
        })
        .ok();
    }

    Ok(report)
}

fn resolve_source_root(path: &Path) -> Result<PathBuf, BuildError> {
    let metadata = fs::metadata(path).map_err(|source| BuildError::SourceRoot {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(BuildError::SourceNotDirectory(path.to_path_buf()));
    }
    fs::canonicalize(path).map_err(|source| BuildError::SourceRoot {
        path: path.to_path_buf(),
        source,
    })
}

/// Marker written and removed to prove the output root accepts files.
const WRITE_CHECK_FILE: &str = ".treepress-write-check";

fn prepare_output_root(path: &Path) -> Result<PathBuf, BuildError> {
    let err = |source| BuildError::OutputRoot {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(path).map_err(err)?;
    let root = fs::canonicalize(path).map_err(err)?;
    let marker = root.join(WRITE_CHECK_FILE);
    fs::File::create(&marker).map_err(err)?;
    fs::remove_file(&marker).map_err(err)?;
    Ok(root)
}

/// The configured skeleton, or `skeleton.html` in the source root if one
/// exists. `None` means the built-in shell.
fn locate_skeleton(config: &BuildConfig, source_root: &Path) -> Option<PathBuf> {
    match &config.skeleton {
        Some(path) => Some(source_root.join(path)),
        None => {
            let default = source_root.join(DEFAULT_SKELETON_FILE);
            default.is_file().then_some(default)
        }
    }
}

#[derive(Clone, Copy)]
struct Roots<'a> {
    source: &'a Path,
    output: &'a Path,
}

impl Roots<'_> {
    fn source_relative(&self, path: &Path) -> String {
        relative_display(self.source, path)
    }

    fn output_relative(&self, path: &Path) -> String {
        relative_display(self.output, path)
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => to_url_path(rel),
        Err(_) => path.display().to_string(),
    }
}

/// Drain walk messages into the manifest and report, forwarding progress.
fn collect(
    messages: Receiver<WalkMessage>,
    roots: Roots,
    events: Option<&Sender<BuildEvent>>,
) -> (BuildManifest, BuildReport) {
    let mut manifest = BuildManifest::new();
    let mut report = BuildReport::default();
    let emit = |event: BuildEvent| {
        if let Some(tx) = events {
            tx.send(event).ok();
        }
    };

    for message in messages {
        match message {
            WalkMessage::Directory { relative } => {
                emit(BuildEvent::DirectoryMirrored {
                    relative: relative.clone(),
                });
                report.directories.push(relative);
            }
            WalkMessage::Unrecognized { path } => {
                let source = roots.source_relative(&path);
                emit(BuildEvent::Unrecognized {
                    source: source.clone(),
                });
                report.unrecognized.push(source);
            }
            WalkMessage::SubtreeFailed { path, error } => {
                let source = roots.source_relative(&path);
                emit(BuildEvent::SubtreeSkipped {
                    source: source.clone(),
                    error: error.to_string(),
                });
                report.failures.push(Failure {
                    source,
                    scope: FailureScope::Subtree,
                    message: error.to_string(),
                });
            }
            WalkMessage::Transformed { node, result } => {
                let source = roots.source_relative(&node.absolute_path);
                match result {
                    Ok(Outcome::Page { metadata, .. }) => {
                        emit(BuildEvent::PageWritten {
                            source,
                            output: metadata.output_path.clone(),
                            listed: metadata.is_complete(),
                        });
                        report.pages.push(metadata.output_path.clone());
                        manifest.push(metadata);
                    }
                    Ok(Outcome::Image { output, action }) => {
                        let output = roots.output_relative(&output);
                        emit(BuildEvent::ImageWritten {
                            source,
                            output: output.clone(),
                            action,
                        });
                        report.images.push(output);
                    }
                    Ok(Outcome::Script { output_dir }) => {
                        emit(BuildEvent::ScriptBundled {
                            source: source.clone(),
                            output_dir: roots.output_relative(&output_dir),
                        });
                        report.scripts.push(source);
                    }
                    Ok(Outcome::Ignored) => {}
                    Err(error) => {
                        emit(BuildEvent::TransformFailed {
                            source: source.clone(),
                            kind: node.kind,
                            error: error.to_string(),
                        });
                        report.failures.push(Failure {
                            source,
                            scope: FailureScope::Transform,
                            message: error.to_string(),
                        });
                    }
                }
            }
        }
    }

    report.directories.sort();
    report.pages.sort();
    report.images.sort();
    report.scripts.sort();
    report.unrecognized.sort();
    report.failures.sort();
    (manifest, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::tests::MockBundler;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{write_bytes, write_file};
    use tempfile::TempDir;

    struct Mocks {
        renderer: MarkdownRenderer,
        images: MockBackend,
        bundler: MockBundler,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                renderer: MarkdownRenderer::new(),
                images: MockBackend::new(),
                bundler: MockBundler::new(),
            }
        }

        fn collaborators(&self) -> Collaborators<'_> {
            Collaborators {
                renderer: &self.renderer,
                images: &self.images,
                bundler: &self.bundler,
            }
        }
    }

    fn paths(tmp: &TempDir) -> BuildPaths {
        BuildPaths {
            source_root: tmp.path().join("content"),
            output_root: tmp.path().join("dist"),
        }
    }

    fn run(tmp: &TempDir, config: &BuildConfig, mocks: &Mocks) -> Result<BuildReport, BuildError> {
        build_with(config, &paths(tmp), &mocks.collaborators(), None)
    }

    #[test]
    fn missing_source_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = run(&tmp, &BuildConfig::default(), &Mocks::new());
        assert!(matches!(result, Err(BuildError::SourceRoot { .. })));
    }

    #[test]
    fn source_root_that_is_a_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("content"), "not a dir");
        let result = run(&tmp, &BuildConfig::default(), &Mocks::new());
        assert!(matches!(result, Err(BuildError::SourceNotDirectory(_))));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        let config = BuildConfig {
            max_image_width: 0,
            ..BuildConfig::default()
        };
        let result = run(&tmp, &config, &Mocks::new());
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    #[test]
    fn configured_skeleton_must_exist() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        let config = BuildConfig {
            skeleton: Some("missing.html".into()),
            ..BuildConfig::default()
        };
        let result = run(&tmp, &config, &Mocks::new());
        assert!(matches!(result, Err(BuildError::Skeleton(_))));
    }

    #[test]
    fn skeleton_without_insertion_point_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_file(
            &tmp.path().join("content/skeleton.html"),
            "<html><body><main></main></body></html>",
        );
        let result = run(&tmp, &BuildConfig::default(), &Mocks::new());
        assert!(matches!(
            result,
            Err(BuildError::Skeleton(SkeletonError::MissingInsertionPoint(_)))
        ));
    }

    #[test]
    fn output_root_that_is_a_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        write_file(&tmp.path().join("dist"), "not a dir");
        let result = run(&tmp, &BuildConfig::default(), &Mocks::new());
        assert!(matches!(result, Err(BuildError::OutputRoot { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn read_only_output_root_is_fatal_before_walking() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("content/a.md"), "# A");
        let dist = tmp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::set_permissions(&dist, fs::Permissions::from_mode(0o555)).unwrap();

        if fs::File::create(dist.join("permission-check")).is_ok() {
            fs::set_permissions(&dist, fs::Permissions::from_mode(0o755)).unwrap();
            eprintln!("skipping read_only_output_root_is_fatal_before_walking: permissions are not enforced");
            return;
        }

        let result = run(&tmp, &BuildConfig::default(), &Mocks::new());
        fs::set_permissions(&dist, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(BuildError::OutputRoot { .. })));
        assert!(!dist.join("a").exists());
    }

    #[test]
    fn write_check_leaves_no_marker() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        run(&tmp, &BuildConfig::default(), &Mocks::new()).unwrap();
        assert!(!tmp.path().join("dist").join(WRITE_CHECK_FILE).exists());
    }

    #[test]
    fn escaped_insertion_id_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        let config = BuildConfig {
            insertion_id: "a&b".to_string(),
            ..BuildConfig::default()
        };
        let result = run(&tmp, &config, &Mocks::new());
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    #[test]
    fn same_source_and_output_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("content")).unwrap();
        let paths = BuildPaths {
            source_root: tmp.path().join("content"),
            output_root: tmp.path().join("content"),
        };
        let mocks = Mocks::new();
        let result = build_with(&BuildConfig::default(), &paths, &mocks.collaborators(), None);
        assert!(matches!(result, Err(BuildError::SameRoots(_))));
    }

    #[test]
    fn source_skeleton_is_used_and_not_reported() {
        let tmp = TempDir::new().unwrap();
        write_file(
            &tmp.path().join("content/skeleton.html"),
            "<html><body><nav><a href=\"/\">Blog</a></nav><div id=\"content\">x</div></body></html>",
        );
        write_file(&tmp.path().join("content/treepress.toml"), "max_image_width = 300\n");
        write_file(&tmp.path().join("content/hello.md"), "# Hello");

        let report = run(&tmp, &BuildConfig::default(), &Mocks::new()).unwrap();
        assert!(report.unrecognized.is_empty());
        assert_eq!(report.pages, vec!["hello/index.html"]);

        let page = fs::read_to_string(tmp.path().join("dist/hello/index.html")).unwrap();
        assert!(page.contains("<nav><a href=\"../\">Blog</a></nav>"));
        assert!(page.contains("<div id=\"content\"><article>"));
        assert!(!tmp.path().join("dist/skeleton.html").exists());
    }

    #[test]
    fn report_collects_every_kind_of_result() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        write_file(
            &content.join("post-a/index.md"),
            "---\ntitle: A\ndescription: about\ndate: 2024-01-01\n---\nbody",
        );
        write_file(&content.join("post-b/index.md"), "---\ntitle: B\n---\nbody");
        write_bytes(&content.join("post-a/banner.gif"), b"GIF89a");
        write_bytes(&content.join("post-a/bad.png"), b"!bad");
        write_file(&content.join("js/app.js"), "1");
        write_file(&content.join("notes.txt"), "x");

        let mocks = Mocks {
            images: MockBackend::failing_on(b'!'),
            ..Mocks::new()
        };
        let report = run(&tmp, &BuildConfig::default(), &mocks).unwrap();

        assert_eq!(report.pages, vec!["post-a/index.html", "post-b/index.html"]);
        assert_eq!(report.images, vec!["post-a/banner.gif"]);
        assert_eq!(report.scripts, vec!["js/app.js"]);
        assert_eq!(report.unrecognized, vec!["notes.txt"]);
        assert_eq!(report.indexed, 1);
        assert_eq!(
            report.excluded_from_index,
            vec![ExcludedDocument {
                output: "post-b/index.html".into(),
                missing: vec!["description", "date"],
            }]
        );
        let failed: Vec<&str> = report
            .failures_in(FailureScope::Transform)
            .map(|f| f.source.as_str())
            .collect();
        assert_eq!(failed, vec!["post-a/bad.png"]);
        assert_eq!(report.index_path, fs::canonicalize(tmp.path().join("dist")).unwrap().join("index.html"));
    }

    #[test]
    fn output_inside_source_is_pruned() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        write_file(&content.join("a.md"), "# A");
        let paths = BuildPaths {
            source_root: content.clone(),
            output_root: content.join("_site"),
        };
        let mocks = Mocks::new();
        build_with(&BuildConfig::default(), &paths, &mocks.collaborators(), None).unwrap();
        // A second run must not walk the first run's output.
        let report =
            build_with(&BuildConfig::default(), &paths, &mocks.collaborators(), None).unwrap();
        assert_eq!(report.pages, vec!["a/index.html"]);
        assert!(report.unrecognized.is_empty());
    }

    #[test]
    fn events_are_streamed() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("content/hello.md"), "# Hello");
        write_file(&tmp.path().join("content/data.csv"), "a,b");

        let (tx, rx) = mpsc::channel();
        let mocks = Mocks::new();
        build_with(&BuildConfig::default(), &paths(&tmp), &mocks.collaborators(), Some(tx))
            .unwrap();
        let events: Vec<BuildEvent> = rx.into_iter().collect();

        assert!(matches!(events.first(), Some(BuildEvent::Started { .. })));
        assert!(events.contains(&BuildEvent::Unrecognized {
            source: "data.csv".into()
        }));
        assert!(events.contains(&BuildEvent::PageWritten {
            source: "hello.md".into(),
            output: "hello/index.html".into(),
            listed: false,
        }));
        assert_eq!(
            events.last(),
            Some(&BuildEvent::IndexWritten {
                output: "index.html".into(),
                entries: 0,
            })
        );
    }

    #[test]
    fn relative_display_strips_root() {
        let root = Path::new("/site/content");
        assert_eq!(relative_display(root, Path::new("/site/content/a/b.md")), "a/b.md");
        assert_eq!(relative_display(root, Path::new("/site/content")), ".");
        assert_eq!(relative_display(root, Path::new("/elsewhere/x")), "/elsewhere/x");
    }
}
