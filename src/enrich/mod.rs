//! Bibliographic metadata enrichment.
//!
//! A resolved paper URL is normalized to its source's canonical
//! abstract-page URL (HuggingFace paper pages and arXiv PDF mirrors both
//! collapse to `arxiv.org/abs/<id>`), fetched through the shared browser
//! session, and scraped with source-specific structural selectors.
//! Enrichment failure for one mention never blocks the others.

mod arxiv;
mod meta_ai;

use crate::core::types::{Mention, PaperMetadata};
use crate::scraping::navigator::Navigator;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EnrichError {
    /// The URL matched none of the known source shapes.
    #[error("no metadata scraper for {0}")]
    UnsupportedSource(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The expected page structure is absent; layout changed.
    #[error("{url}: expected {what} not found on page")]
    StructureMissing { url: String, what: &'static str },
}

/// Page-fetch capability the enricher needs. Implemented by [`Navigator`];
/// tests substitute canned HTML.
#[async_trait]
pub trait FetchPage: Send {
    async fn fetch(&mut self, url: &str) -> Result<String, EnrichError>;
}

#[async_trait]
impl FetchPage for Navigator {
    async fn fetch(&mut self, url: &str) -> Result<String, EnrichError> {
        self.goto(url)
            .await
            .map_err(|e| EnrichError::Navigation(e.to_string()))?;
        self.content()
            .await
            .map_err(|e| EnrichError::Navigation(e.to_string()))
    }
}

/// Canonical scrape target for a resolved paper URL.
#[derive(Debug, PartialEq, Eq)]
pub enum PaperPage {
    /// arXiv abstract page (also the canonical form of HuggingFace paper
    /// pages and arXiv PDF links).
    Arxiv { canonical: String },
    MetaAi { url: String },
}

static ARXIV_ID: OnceLock<Regex> = OnceLock::new();

fn arxiv_id(url: &str) -> Option<String> {
    let re = ARXIV_ID
        .get_or_init(|| Regex::new(r"(\d{4}\.\d{4,5})").expect("valid arxiv id pattern"));
    re.captures(url).map(|c| c[1].to_string())
}

/// Normalize a resolved URL to the page its metadata scraper expects.
pub fn canonical_paper_page(url: &str) -> Option<PaperPage> {
    if url.contains("arxiv.org") || url.contains("huggingface.co/papers") {
        return arxiv_id(url).map(|id| PaperPage::Arxiv {
            canonical: format!("https://arxiv.org/abs/{id}"),
        });
    }
    if url.contains("ai.meta.com") {
        return Some(PaperPage::MetaAi {
            url: url.to_string(),
        });
    }
    None
}

/// Enrich a single mention's target URL.
pub async fn enrich_mention<F: FetchPage + ?Sized>(
    fetcher: &mut F,
    target_url: &str,
) -> Result<PaperMetadata, EnrichError> {
    match canonical_paper_page(target_url) {
        Some(PaperPage::Arxiv { canonical }) => {
            let html = fetcher.fetch(&canonical).await?;
            arxiv::parse_abstract_page(&html, &canonical)
        }
        Some(PaperPage::MetaAi { url }) => {
            let html = fetcher.fetch(&url).await?;
            meta_ai::parse_publication_page(&html, &url)
        }
        None => Err(EnrichError::UnsupportedSource(target_url.to_string())),
    }
}

/// Enrich a whole batch in place; returns how many mentions gained
/// metadata. Failures are logged per mention and never touch the rest of
/// the batch.
pub async fn enrich_mentions<F: FetchPage + ?Sized>(
    fetcher: &mut F,
    mentions: &mut [Mention],
) -> usize {
    let mut enriched = 0;
    for mention in mentions.iter_mut() {
        if mention.metadata.is_some() {
            continue;
        }
        match enrich_mention(fetcher, &mention.target_url).await {
            Ok(metadata) => {
                info!("enriched {} ({})", mention.target_url, metadata.title);
                mention.metadata = Some(metadata);
                enriched += 1;
            }
            Err(e) => warn!("enrichment failed for {}: {}", mention.target_url, e),
        }
    }
    enriched
}

/// First matching element's text content, trimmed; `None` when the selector
/// matches nothing or only whitespace.
pub(crate) fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Strip a leading descriptor label (`Title:`, `Authors:`, ...) if present.
pub(crate) fn strip_label(text: &str, label: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix(label)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
