//! The scrolling crawl loop.
//!
//! An explicit iterative state machine over the rendered feed:
//!
//! ```text
//! Scanning ──new items──▶ Scrolling ──budget left──▶ Scanning
//!    │                        │
//!    │ id set unchanged       │ budget reached
//!    ▼                        ▼
//! DetailPass ───────────────▶ Done
//! ```
//!
//! Termination is the identifier-set equality predicate: when a scan renders
//! exactly the ids of the previous scan, the feed is exhausted or scrolling
//! has silently stalled. Both cases are treated identically as end-of-feed.

pub mod record;
pub mod views;

use crate::core::types::{Mention, RecognizedSource};
use crate::resolve::ResolveUrl;
use crate::scraping::feed::{FeedItemSnapshot, FeedView};
use record::{parse_feed_item, ParseOutcome, ViewMode};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The item detached from the rendered tree mid-operation. Aborts the
    /// current batch only; the crawl continues.
    #[error("feed item {seq} detached from the rendered tree")]
    StaleView { seq: u64 },

    /// Total loss of the browser session. Fatal to the invocation.
    #[error("browser session lost: {0}")]
    SessionLost(String),
}

/// Read-only collaborators threaded through one page crawl.
pub struct CrawlContext<'a> {
    pub sources: &'a [RecognizedSource],
    pub resolver: &'a dyn ResolveUrl,
    /// Ceiling on accepted mentions before the loop stops requesting new
    /// batches. Already-queued detail items are still resolved.
    pub budget: usize,
}

#[derive(Debug)]
enum CrawlState {
    Scanning,
    Scrolling { last_seq: Option<u64> },
    DetailPass,
    Done,
}

/// Ephemeral per-page state, owned exclusively by [`crawl_feed`].
#[derive(Default)]
struct CrawlSession {
    /// Ids already converted to a Mention or explicitly rejected.
    seen: HashSet<u64>,
    /// Permalinks of truncated items awaiting the detail pass.
    pending_detail: BTreeSet<String>,
    /// Id set from the previous scan; equality terminates the scroll loop.
    last_batch: HashSet<u64>,
    accepted: usize,
}

/// Crawl one search-results feed to completion and return its mentions.
///
/// Only [`CrawlError::SessionLost`] escapes; every other failure mode
/// degrades (stale batch abandoned, malformed items rejected, resolver
/// failures keep the original URL).
pub async fn crawl_feed<V: FeedView + ?Sized>(
    view: &mut V,
    ctx: &CrawlContext<'_>,
) -> Result<Vec<Mention>, CrawlError> {
    let mut state = CrawlState::Scanning;
    let mut session = CrawlSession::default();
    let mut mentions: Vec<Mention> = Vec::new();

    loop {
        state = match state {
            CrawlState::Scanning => {
                let items = view.snapshot().await?;
                let ids: HashSet<u64> = items.iter().map(|i| i.seq).collect();
                if ids == session.last_batch {
                    debug!("scan rendered no new items; treating feed as exhausted");
                    CrawlState::DetailPass
                } else {
                    session.last_batch = ids;
                    let last_seq =
                        scan_batch(view, ctx, &mut session, &items, &mut mentions).await?;
                    CrawlState::Scrolling { last_seq }
                }
            }

            CrawlState::Scrolling { last_seq } => {
                if session.accepted >= ctx.budget {
                    info!(
                        "crawl budget reached ({} accepted); stopping new batches",
                        session.accepted
                    );
                    CrawlState::DetailPass
                } else {
                    if let Some(seq) = last_seq {
                        match view.advance_past(seq).await {
                            Ok(()) => {}
                            Err(CrawlError::StaleView { seq }) => {
                                debug!("item {seq} gone before scroll; scanning anyway");
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    CrawlState::Scanning
                }
            }

            CrawlState::DetailPass => {
                let pending = std::mem::take(&mut session.pending_detail);
                for permalink in pending {
                    detail_pass(view, ctx, &permalink, &mut mentions).await?;
                }
                CrawlState::Done
            }

            CrawlState::Done => break,
        };
    }

    Ok(mentions)
}

/// Process every unseen item of the current scan in ascending sequence
/// order (DOM iteration order is not guaranteed to match feed chronology).
/// Returns the last processed sequence id, for the subsequent scroll.
async fn scan_batch<V: FeedView + ?Sized>(
    view: &mut V,
    ctx: &CrawlContext<'_>,
    session: &mut CrawlSession,
    items: &[FeedItemSnapshot],
    mentions: &mut Vec<Mention>,
) -> Result<Option<u64>, CrawlError> {
    let mut fresh: Vec<&FeedItemSnapshot> = items
        .iter()
        .filter(|i| !session.seen.contains(&i.seq))
        .collect();
    fresh.sort_by_key(|i| i.seq);

    let mut last_processed = None;
    for item in fresh {
        match view.move_viewport_to(item.seq).await {
            Ok(()) => {}
            Err(CrawlError::StaleView { seq }) => {
                // The tree re-rendered under us; drop the rest of this
                // batch and let the scroll produce a fresh scan.
                warn!("feed item {seq} went stale mid-batch; abandoning batch");
                break;
            }
            Err(e) => return Err(e),
        }
        session.seen.insert(item.seq);
        last_processed = Some(item.seq);

        match parse_feed_item(item, ctx.sources, ViewMode::List, ctx.resolver).await {
            ParseOutcome::Mention(m) => {
                info!(
                    "accepted mention by @{} -> {} ({} views)",
                    m.author_handle, m.target_url, m.view_count
                );
                mentions.push(m);
                session.accepted += 1;
            }
            ParseOutcome::NeedsDetail { permalink } => {
                debug!("item {} truncated; queued {}", item.seq, permalink);
                session.pending_detail.insert(permalink);
            }
            ParseOutcome::Rejected(reason) => {
                debug!("item {} rejected: {}", item.seq, reason);
            }
        }
    }
    Ok(last_processed)
}

/// Revisit one truncated item on its permalink page. The detail page is the
/// authoritative source for the view count the list view hid behind the
/// truncation. Parse failures drop the item silently.
async fn detail_pass<V: FeedView + ?Sized>(
    view: &mut V,
    ctx: &CrawlContext<'_>,
    permalink: &str,
    mentions: &mut Vec<Mention>,
) -> Result<(), CrawlError> {
    match view.open_detail(permalink).await {
        Ok(Some(item)) => {
            match parse_feed_item(&item, ctx.sources, ViewMode::Detail, ctx.resolver).await {
                ParseOutcome::Mention(m) => {
                    info!(
                        "detail pass accepted @{} -> {} ({} views)",
                        m.author_handle, m.target_url, m.view_count
                    );
                    mentions.push(m);
                }
                ParseOutcome::NeedsDetail { .. } => {
                    warn!("detail page {permalink} still truncated; dropping item");
                }
                ParseOutcome::Rejected(reason) => {
                    debug!("detail page {permalink} rejected: {reason}");
                }
            }
        }
        Ok(None) => warn!("detail page {permalink} rendered no item; dropping"),
        Err(CrawlError::StaleView { .. }) => {
            warn!("detail page {permalink} went stale; dropping item");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
