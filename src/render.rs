//! Markdown rendering with YAML frontmatter.
//!
//! A document may start with a frontmatter block:
//!
//! ```text
//! ---
//! title: Cloud pricing
//! description: What a small VPS really costs
//! date: 2024-02-01
//! ---
//! # Body starts here
//! ```
//!
//! Frontmatter is optional and so is every field in it. Scalars of any
//! YAML type are accepted and stringified (`date: 2024-02-01` and
//! `date: "2024-02-01"` are equivalent); other keys are ignored.

use pulldown_cmark::{Options, Parser, html as md_html};
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),
    #[error("frontmatter must be a mapping of keys to values")]
    FrontmatterShape,
}

/// Result of rendering one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub body_html: String,
}

/// Turns raw document text into metadata plus an HTML body.
///
/// Implementations must be `Sync`: one renderer is shared by every
/// concurrent document transform.
pub trait Renderer: Sync {
    fn render(&self, raw: &str) -> Result<Rendered, RenderError>;
}

/// CommonMark renderer (tables, footnotes, strikethrough, smart
/// punctuation) with raw HTML passed through.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_SMART_PUNCTUATION
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, raw: &str) -> Result<Rendered, RenderError> {
        let (frontmatter, body) = split_frontmatter(raw);

        let fields = match frontmatter {
            Some(yaml) => parse_fields(yaml)?,
            None => BTreeMap::new(),
        };

        let mut body_html = String::new();
        md_html::push_html(&mut body_html, Parser::new_ext(body, Self::options()));

        let field = |key: &str| fields.get(key).cloned();
        Ok(Rendered {
            title: field("title"),
            description: field("description"),
            date: field("date"),
            body_html,
        })
    }
}

/// Split a leading `---` fenced block from the body.
///
/// Returns `(None, raw)` when the document has no (closed) frontmatter.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    const FENCE: &str = "---";
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let Some(after_open) = text.strip_prefix(FENCE) else {
        return (None, raw);
    };
    let Some(after_open) = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
    else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, raw)
}

fn parse_fields(yaml: &str) -> Result<BTreeMap<String, String>, RenderError> {
    if yaml.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let value: Value = serde_yaml::from_str(yaml)?;
    let Value::Mapping(mapping) = value else {
        return Err(RenderError::FrontmatterShape);
    };

    Ok(mapping
        .into_iter()
        .filter_map(|(k, v)| Some((scalar_to_string(&k)?, scalar_to_string(&v)?)))
        .collect())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
