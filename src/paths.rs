//! Path resolution inside the mirrored output tree.
//!
//! Every page is written somewhere below the output root, and every page
//! links back to things that live at the root (stylesheets, the index,
//! other posts). Pages must keep working when the site is served from a
//! sub-path or opened straight from disk, so links are always emitted
//! relative to the page's own directory.
//!
//! All functions here are pure: they work on `/`-separated relative path
//! strings (or [`Path`]s for the filesystem side) and never touch the disk.

use std::path::{Component, Path};

/// Convert a filesystem-relative path to a `/`-separated URL path.
pub fn to_url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Number of directory levels between the output root and the directory
/// containing `file` (a root-relative, `/`-separated file path).
///
/// ```text
/// index.html              → 0
/// post-a/index.html       → 1
/// notes/2024/x/index.html → 3
/// ```
pub fn depth_of(file: &str) -> usize {
    file.split('/').filter(|s| !s.is_empty()).count().saturating_sub(1)
}

/// The prefix that climbs from a directory at `depth` back to the root.
///
/// Depth 0 yields an empty prefix so root pages link with bare names.
pub fn prefix_to_root(depth: usize) -> String {
    "../".repeat(depth)
}

/// Relative URL from the directory `from_dir` to the target `to`, both
/// given relative to the output root.
///
/// ```text
/// relative_path("a/b", "a/c/page.html") → "../c/page.html"
/// relative_path("", "post-a/")          → "post-a/"
/// relative_path("a", "a")               → ""
/// ```
pub fn relative_path(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let trailing_slash = to.ends_with('/');
    let target: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&target[common..]);

    let mut out = parts.join("/");
    if trailing_slash && !out.is_empty() {
        out.push('/');
    }
    out
}

/// Lexically resolve `relative` against the directory `base_dir` (both
/// root-relative). `..` never climbs above the root.
pub fn resolve(base_dir: &str, relative: &str) -> String {
    let mut stack: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// Link from a page in `from_dir` to the page stored at `output_path`.
///
/// Directory-style pages (`post-a/index.html`) are linked by their
/// directory so the URL stays clean; flat pages are linked directly.
///
/// ```text
/// page_link("", "post-a/index.html")      → "post-a/"
/// page_link("notes", "index.html")        → "../"
/// page_link("notes", "notes/index.html")  → "./"
/// ```
pub fn page_link(from_dir: &str, output_path: &str) -> String {
    let directory = if output_path == "index.html" {
        Some("")
    } else {
        output_path
            .strip_suffix("index.html")
            .filter(|dir| dir.ends_with('/'))
    };
    match directory {
        Some(dir) => {
            let mut link = relative_path(from_dir, dir);
            if link.is_empty() {
                return "./".to_string();
            }
            if !link.ends_with('/') {
                link.push('/');
            }
            link
        }
        None => relative_path(from_dir, output_path),
    }
}

/// Rewrite root-absolute `href="/…"` and `src="/…"` attributes so they
/// resolve from a page at `depth`.
///
/// Protocol-relative URLs (`//cdn.example.com/…`) are left untouched.
pub fn rewrite_root_links(html: &str, depth: usize) -> String {
    let prefix = prefix_to_root(depth);
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some((start, attr_len)) = find_root_attr(rest) {
        let value_start = start + attr_len;
        out.push_str(&rest[..value_start]);
        let value = &rest[value_start..];
        // Skip the leading '/' of the absolute path.
        let stripped = &value[1..];
        if stripped.starts_with('"') || stripped.starts_with('\'') {
            // `href="/"` points at the root itself.
            out.push_str(if prefix.is_empty() { "./" } else { &prefix });
        } else {
            out.push_str(&prefix);
        }
        rest = stripped;
    }
    out.push_str(rest);
    out
}

/// Locate the next `href="/` or `src="/` (either quote style) that is not
/// protocol-relative. Returns the match offset and the length of the
/// attribute prefix up to, but excluding, the leading slash.
fn find_root_attr(haystack: &str) -> Option<(usize, usize)> {
    const ATTRS: [&str; 4] = ["href=\"", "src=\"", "href='", "src='"];
    let mut offset = 0;
    loop {
        let slice = &haystack[offset..];
        let (pos, attr) = ATTRS
            .iter()
            .filter_map(|a| slice.find(a).map(|p| (p, *a)))
            .min_by_key(|(p, _)| *p)?;
        let value_at = offset + pos + attr.len();
        let value = &haystack[value_at..];
        if value.starts_with('/') && !value.starts_with("//") {
            return Some((offset + pos, attr.len()));
        }
        offset = value_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_directories_only() {
        assert_eq!(depth_of("index.html"), 0);
        assert_eq!(depth_of("post-a/index.html"), 1);
        assert_eq!(depth_of("notes/2024/x/index.html"), 3);
    }

    #[test]
    fn prefix_is_empty_at_root() {
        assert_eq!(prefix_to_root(0), "");
        assert_eq!(prefix_to_root(2), "../../");
    }

    #[test]
    fn relative_path_between_siblings() {
        assert_eq!(relative_path("a/b", "a/c/page.html"), "../c/page.html");
    }

    #[test]
    fn relative_path_from_root() {
        assert_eq!(relative_path("", "post-a/"), "post-a/");
        assert_eq!(relative_path("", "style.css"), "style.css");
    }

    #[test]
    fn relative_path_to_self_is_empty() {
        assert_eq!(relative_path("a", "a"), "");
    }

    #[test]
    fn relative_path_to_ancestor() {
        assert_eq!(relative_path("a/b/c", "a/"), "../../");
    }

    #[test]
    fn resolve_never_escapes_root() {
        assert_eq!(resolve("a", "../../x.css"), "x.css");
    }

    #[test]
    fn relative_links_round_trip_to_root_assets() {
        for dir in ["", "a", "a/b", "a/b/c/d"] {
            let page = if dir.is_empty() {
                "index.html".to_string()
            } else {
                format!("{dir}/index.html")
            };
            let depth = depth_of(&page);
            let link = format!("{}assets/site.css", prefix_to_root(depth));
            assert_eq!(resolve(dir, &link), resolve("", "assets/site.css"));

            let computed = relative_path(dir, "assets/site.css");
            assert_eq!(resolve(dir, &computed), "assets/site.css");
        }
    }

    #[test]
    fn page_link_for_directory_pages() {
        assert_eq!(page_link("", "post-a/index.html"), "post-a/");
        assert_eq!(page_link("", "notes/first.html"), "notes/first.html");
        assert_eq!(page_link("", "index.html"), "./");
    }

    #[test]
    fn page_link_from_nested_directory() {
        assert_eq!(page_link("notes", "index.html"), "../");
        assert_eq!(page_link("notes", "notes/index.html"), "./");
        assert_eq!(page_link("notes/2024", "post-a/index.html"), "../../post-a/");
        assert_eq!(page_link("notes", "notes/first.html"), "first.html");
    }

    #[test]
    fn page_link_only_strips_a_whole_index_name() {
        assert_eq!(page_link("", "notes/myindex.html"), "notes/myindex.html");
    }

    #[test]
    fn rewrite_root_links_at_depth() {
        let html = r#"<link href="/style.css"><img src='/logo.png'><a href="/">home</a>"#;
        assert_eq!(
            rewrite_root_links(html, 2),
            r#"<link href="../../style.css"><img src='../../logo.png'><a href="../../">home</a>"#
        );
    }

    #[test]
    fn rewrite_root_links_at_root() {
        let html = r#"<link href="/style.css"><a href="/">home</a>"#;
        assert_eq!(
            rewrite_root_links(html, 0),
            r#"<link href="style.css"><a href="./">home</a>"#
        );
    }

    #[test]
    fn rewrite_leaves_other_links_alone() {
        let html = r#"<script src="//cdn.example.com/x.js"></script><a href="https://e.com/">e</a><a href="rel/x">r</a>"#;
        assert_eq!(rewrite_root_links(html, 3), html);
    }

    #[test]
    fn url_path_uses_forward_slashes() {
        let p = Path::new("a").join("b").join("c.html");
        assert_eq!(to_url_path(&p), "a/b/c.html");
    }
}
