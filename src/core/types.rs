use serde::{Deserialize, Serialize};

/// Bibliographic metadata scraped from a paper's canonical page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PaperMetadata {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
}

/// One social-network post linking to a paper, enriched with engagement and
/// bibliographic data. The persistence identity is `(author_handle, target_url)`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Mention {
    /// Full rendered text of the feed item (diagnostic use).
    pub raw_text: String,
    /// Posting account's handle, leading `@` stripped.
    pub author_handle: String,
    pub profile_image_url: String,
    #[serde(default)]
    pub embedded_image_url: Option<String>,
    /// Resolved, canonical link to the referenced paper (never a shortener URL).
    pub target_url: String,
    /// Name of the recognized-source pattern `target_url` matched.
    pub matched_source: String,
    pub view_count: u64,
    /// Absent until enrichment succeeds.
    #[serde(default)]
    pub metadata: Option<PaperMetadata>,
}

impl Mention {
    /// Dedup key enforced at the persistence boundary.
    pub fn key(&self) -> (String, String) {
        (self.author_handle.clone(), self.target_url.clone())
    }
}

/// A domain pattern identifying outbound links worth ingesting.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizedSource {
    /// Stable label stored as `Mention::matched_source` (e.g. `"arxiv"`).
    pub name: String,
    /// Substring the resolved URL must contain (e.g. `"arxiv.org"`).
    pub pattern: String,
}

impl RecognizedSource {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// A mention as persisted by a store: the record plus the crawl timestamp.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoredMention {
    #[serde(flatten)]
    pub mention: Mention,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
}

/// Per-search-page outcome summary.
#[derive(Debug, Serialize, Clone)]
pub struct PageReport {
    pub query: String,
    pub url: String,
    /// Mentions produced by the crawl loop (list pass + detail pass).
    pub accepted: usize,
    /// Mentions that ended up with metadata attached.
    pub enriched: usize,
    /// Rows the store actually inserted (duplicates are silently ignored).
    pub stored: usize,
}

/// Invocation-level roll-up across all configured search pages.
#[derive(Debug, Serialize, Clone, Default)]
pub struct IngestReport {
    pub pages: Vec<PageReport>,
}

impl IngestReport {
    pub fn accepted(&self) -> usize {
        self.pages.iter().map(|p| p.accepted).sum()
    }

    pub fn stored(&self) -> usize {
        self.pages.iter().map(|p| p.stored).sum()
    }
}
