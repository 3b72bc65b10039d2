//! CLI output formatting for the build.
//!
//! # Information-First Display
//!
//! Every line leads with the source file it is about, and shows where the
//! result went as secondary context. Problems are indented under the file
//! they belong to so the log reads as an inventory of the content tree.
//!
//! # Output Format
//!
//! ## Progress
//!
//! ```text
//! Building content → dist
//! post-a/
//!     post-a/index.md → post-a/index.html
//!     post-a/banner.gif → post-a/banner.gif (resized)
//!     post-a/notes.txt: unrecognized, skipped
//! private/: skipped
//!     cannot read directory content/private: Permission denied (os error 13)
//! Index → index.html (1 entry)
//! ```
//!
//! ## Summary
//!
//! ```text
//! Built 2 pages, 1 image, 0 scripts; 1 page on the index
//! Unrecognized (1)
//!     post-a/notes.txt
//! Not on index (1)
//!     post-b/index.html: missing description, date
//! Skipped directories (1)
//!     private
//!         cannot read directory ...
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{BuildEvent, BuildReport, FailureScope};
use crate::transform::ImageAction;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn directory_label(relative: &str) -> String {
    if relative.is_empty() || relative == "." {
        "./".to_string()
    } else {
        format!("{relative}/")
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Started { source, output } => vec![format!(
            "Building {} \u{2192} {}",
            source.display(),
            output.display()
        )],
        BuildEvent::DirectoryMirrored { relative } => vec![directory_label(relative)],
        BuildEvent::PageWritten {
            source,
            output,
            listed,
        } => {
            let mut lines = vec![format!("{}{} \u{2192} {}", indent(1), source, output)];
            if !listed {
                lines.push(format!("{}not on index: incomplete metadata", indent(2)));
            }
            lines
        }
        BuildEvent::ImageWritten {
            source,
            output,
            action,
        } => {
            let action = match action {
                ImageAction::Copied => "copied",
                ImageAction::Resized => "resized",
            };
            vec![format!(
                "{}{} \u{2192} {} ({})",
                indent(1),
                source,
                output,
                action
            )]
        }
        BuildEvent::ScriptBundled { source, output_dir } => vec![format!(
            "{}{} \u{2192} {} (bundled)",
            indent(1),
            source,
            directory_label(output_dir)
        )],
        BuildEvent::Unrecognized { source } => {
            vec![format!("{}{}: unrecognized, skipped", indent(1), source)]
        }
        BuildEvent::SubtreeSkipped { source, error } => vec![
            format!("{}: skipped", directory_label(source)),
            format!("{}{}", indent(1), error),
        ],
        BuildEvent::TransformFailed {
            source,
            kind,
            error,
        } => vec![
            format!("{}{}: {} failed", indent(1), source, kind.label()),
            format!("{}{}", indent(2), error),
        ],
        BuildEvent::IndexWritten { output, entries } => vec![format!(
            "Index \u{2192} {} ({})",
            output,
            count(*entries, "entry", "entries")
        )],
    }
}

/// Print a build event to stdout.
pub fn print_build_event(event: &BuildEvent) {
    for line in format_build_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-build summary.
///
/// Sections only appear when they have entries.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Built {}, {}, {}; {} on the index",
        count(report.pages.len(), "page", "pages"),
        count(report.images.len(), "image", "images"),
        count(report.scripts.len(), "script", "scripts"),
        count(report.indexed, "page", "pages"),
    )];

    if !report.unrecognized.is_empty() {
        lines.push(format!("Unrecognized ({})", report.unrecognized.len()));
        for source in &report.unrecognized {
            lines.push(format!("{}{}", indent(1), source));
        }
    }

    if !report.excluded_from_index.is_empty() {
        lines.push(format!("Not on index ({})", report.excluded_from_index.len()));
        for doc in &report.excluded_from_index {
            lines.push(format!(
                "{}{}: missing {}",
                indent(1),
                doc.output,
                doc.missing.join(", ")
            ));
        }
    }

    for (scope, heading) in [
        (FailureScope::Subtree, "Skipped directories"),
        (FailureScope::Transform, "Failed files"),
    ] {
        let failures: Vec<_> = report.failures_in(scope).collect();
        if failures.is_empty() {
            continue;
        }
        lines.push(format!("{} ({})", heading, failures.len()));
        for failure in failures {
            lines.push(format!("{}{}", indent(1), failure.source));
            lines.push(format!("{}{}", indent(2), failure.message));
        }
    }

    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
