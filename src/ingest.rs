//! Per-search-page orchestration: navigate, crawl, enrich, persist.

use crate::core::config::search_url;
use crate::core::types::PageReport;
use crate::core::AppState;
use crate::crawl::{crawl_feed, CrawlContext};
use crate::enrich::enrich_mentions;
use crate::resolve::ResolveUrl;
use crate::scraping::challenge;
use crate::scraping::feed::CdpFeedView;
use crate::scraping::navigator::Navigator;
use crate::store::MentionStore;
use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

/// Crawl one templated search query end to end.
///
/// Recoverable conditions (login wall without credentials, stale batches,
/// per-mention enrichment failures) degrade inside; only session loss and
/// store failures propagate.
pub async fn ingest_query(
    state: &AppState,
    nav: &mut Navigator,
    resolver: &dyn ResolveUrl,
    store: &mut dyn MentionStore,
    query: &str,
    since: &str,
) -> Result<PageReport> {
    let url = search_url(query, since);
    info!("crawling search page: {}", url);
    nav.goto(&url).await?;

    let html = nav.content().await?;
    if challenge::looks_like_login_wall(&html) {
        let Some(creds) = state.config.credentials() else {
            warn!("login challenge on {} and no credentials configured; skipping page", url);
            return Ok(empty_report(query, url));
        };
        if !challenge::try_login(nav, &creds).await? {
            warn!("scripted login failed; skipping page {}", url);
            return Ok(empty_report(query, url));
        }
        // Back to the search page with the authenticated session.
        nav.goto(&url).await?;
    }

    let sources = state.config.resolve_sources();
    let ctx = CrawlContext {
        sources: &sources,
        resolver,
        budget: state.config.resolve_budget(),
    };

    let mut mentions = {
        let mut view = CdpFeedView::new(nav);
        crawl_feed(&mut view, &ctx).await?
    };
    let accepted = mentions.len();

    let enriched = enrich_mentions(nav, &mut mentions).await;
    let stored = store.insert_batch(&mentions, Utc::now()).await?;

    info!(
        "page done: {} accepted, {} enriched, {} stored ({})",
        accepted, enriched, stored, query
    );
    Ok(PageReport {
        query: query.to_string(),
        url,
        accepted,
        enriched,
        stored,
    })
}

fn empty_report(query: &str, url: String) -> PageReport {
    PageReport {
        query: query.to_string(),
        url,
        accepted: 0,
        enriched: 0,
        stored: 0,
    }
}
