use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vault_model::{Result, SearchState};

/// A highlighted span within a matched field, byte offsets into that
/// field's raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub field: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub score: f32,
    pub matched_fields: Vec<String>,
    pub highlights: Vec<HighlightSpan>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// How a search index mutation should be applied (spec.md §4.5,
/// `notify_update`).
#[derive(Debug, Clone)]
pub enum IndexUpdate {
    /// The index was already mutated in place; this is metrics-only.
    Incremental,
    /// A new index generation exists; the service must swap its reference
    /// atomically and transition Error/Initializing -> Ready on success.
    Rebuild,
}

/// Full-text index over a vault's Markdown files (spec.md §4.5). All query
/// methods return up to 20 hits; empty inputs return an empty result, never
/// an error.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn by_text(&self, query: &str) -> Result<SearchResults>;
    async fn by_title(&self, query: &str) -> Result<SearchResults>;
    async fn by_tag(&self, tag: &str) -> Result<SearchResults>;
    async fn by_tags_all(&self, tags: &[String]) -> Result<SearchResults>;
    async fn by_tags_any(&self, tags: &[String]) -> Result<SearchResults>;
    async fn by_wikilink(&self, target: &str) -> Result<SearchResults>;
    async fn by_wikilinks_all(&self, targets: &[String]) -> Result<SearchResults>;
    async fn by_wikilinks_any(&self, targets: &[String]) -> Result<SearchResults>;
    async fn fuzzy(&self, query: &str, distance: u8) -> Result<SearchResults>;
    async fn phrase(&self, phrase: &str) -> Result<SearchResults>;
    async fn prefix(&self, prefix: &str) -> Result<SearchResults>;
    async fn combined(
        &self,
        text: Option<&str>,
        tags: &[String],
        wikilinks: &[String],
    ) -> Result<SearchResults>;

    /// Index or re-index one document, replacing any prior document at the
    /// same path. `tags`/`wikilinks` are the deduplicated sets described in
    /// spec.md §4.5; `body` is the document's raw text content.
    async fn index_document(&self, path: &str, title: &str, tags: &[String], wikilinks: &[String], body: &str) -> Result<()>;

    /// Remove one document by path (spec.md §4.6, Worker `Deleted` step).
    async fn remove_document(&self, path: &str) -> Result<()>;

    /// Drop every document (called during re-index).
    async fn clear(&self) -> Result<()>;

    async fn notify_update(&self, update: IndexUpdate);

    fn state(&self) -> SearchState;
}
