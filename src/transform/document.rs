//! Document transform: markdown in, hydrated page out.

use super::{Outcome, TransformContext, TransformError, read_error, write_error};
use crate::aggregate::INDEX_PAGE;
use crate::classify::FileNode;
use crate::config::Layout;
use crate::dates;
use crate::paths::{depth_of, rewrite_root_links};
use crate::types::DocumentMetadata;
use crate::walk::DirectoryMapping;
use maud::{Markup, PreEscaped, html};
use std::fs;

/// Root-relative output path of a document.
///
/// ```text
/// dir "notes", stem "hello", nested-index → notes/hello/index.html
/// dir "notes", stem "hello", flat         → notes/hello.html
/// dir "notes", stem "index", either       → notes/index.html
/// ```
pub fn page_output_path(dir_relative: &str, stem: &str, layout: Layout) -> String {
    let file = if stem.eq_ignore_ascii_case("index") {
        INDEX_PAGE.to_string()
    } else {
        match layout {
            Layout::Flat => format!("{stem}.html"),
            Layout::NestedIndex => format!("{stem}/{INDEX_PAGE}"),
        }
    };
    if dir_relative.is_empty() {
        file
    } else {
        format!("{dir_relative}/{file}")
    }
}

/// The article wrapped around every rendered document body.
pub fn post_template(title: Option<&str>, date: Option<&str>, body_html: &str) -> Markup {
    html! {
        article {
            header {
                @if let Some(title) = title {
                    h1 { (title) }
                }
                @if let Some(raw) = date {
                    p {
                        @if let Some(parsed) = dates::parse_date(raw) {
                            time datetime=(parsed.format("%Y-%m-%d").to_string()) {
                                (dates::format_date(raw))
                            }
                        } @else {
                            (raw)
                        }
                    }
                }
            }
            section.prose.content {
                (PreEscaped(body_html))
            }
        }
    }
}

pub fn transform(
    node: &FileNode,
    dir: &DirectoryMapping,
    sequence: usize,
    ctx: &TransformContext,
) -> Result<Outcome, TransformError> {
    let raw = fs::read_to_string(&node.absolute_path).map_err(read_error(&node.absolute_path))?;
    let rendered = ctx.renderer.render(&raw)?;

    let output_path = page_output_path(&dir.relative, &node.name, ctx.layout);
    if output_path == INDEX_PAGE {
        return Err(TransformError::IndexCollision(output_path));
    }

    let article = post_template(
        rendered.title.as_deref(),
        rendered.date.as_deref(),
        &rendered.body_html,
    );
    let page = ctx.skeleton.hydrate(&article.into_string());
    let page = rewrite_root_links(&page, depth_of(&output_path));

    let output = ctx.output_root.join(&output_path);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(write_error(parent))?;
    }
    fs::write(&output, page).map_err(write_error(&output))?;

    Ok(Outcome::Page {
        output,
        metadata: DocumentMetadata {
            title: rendered.title,
            description: rendered.description,
            date: rendered.date,
            output_path,
            sequence,
        },
    })
}
