//! Types shared between the walker, the transforms and the aggregator.

/// Metadata emitted once per successfully rendered document.
///
/// Fields come straight from frontmatter and may be missing. A record is
/// only listed on the index page when [`is_complete`](Self::is_complete)
/// holds; partial records are never shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    /// Page location relative to the output root, `/`-separated.
    pub output_path: String,
    /// Discovery order assigned by the walker.
    pub sequence: usize,
}

impl DocumentMetadata {
    /// All of title, description and date are present and non-blank.
    pub fn is_complete(&self) -> bool {
        [&self.title, &self.description, &self.date]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Names of the fields that keep this record off the index.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("date", &self.date),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}
