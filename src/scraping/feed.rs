//! Rendered-feed abstraction over the live timeline DOM.
//!
//! The crawl loop never touches CDP directly: it sees the feed through the
//! [`FeedView`] trait and plain [`FeedItemSnapshot`] values. The one concrete
//! adapter, [`CdpFeedView`], tags every `article` element with a
//! monotonically increasing `data-ps-seq` attribute the first time it is
//! rendered, so items keep a stable identifier for the whole page session
//! even as the virtualized timeline recycles DOM nodes around them.

use crate::crawl::CrawlError;
use crate::scraping::navigator::Navigator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Render settle time after a viewport advance. Shorter than the
/// post-navigation settle: the page is already hydrated, only the next
/// timeline chunk needs to stream in.
const SCROLL_SETTLE_MS: u64 = 1_500;

/// One rendered feed item, as captured in a single DOM read.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeedItemSnapshot {
    /// Stable-for-the-session sequence id, ascending in render order.
    pub seq: u64,
    /// Full rendered text of the item.
    pub text: String,
    /// Outbound link hrefs, in DOM order.
    pub links: Vec<String>,
    /// Image srcs, in DOM order.
    pub images: Vec<String>,
    /// Detail-page permalink, from the timestamp element's enclosing anchor.
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Capability the crawl loop needs from a live feed rendering.
#[async_trait]
pub trait FeedView: Send {
    /// Snapshot all currently rendered feed items.
    async fn snapshot(&mut self) -> Result<Vec<FeedItemSnapshot>, CrawlError>;

    /// Move the viewport to the given item. `StaleView` when the item has
    /// detached from the tree.
    async fn move_viewport_to(&mut self, seq: u64) -> Result<(), CrawlError>;

    /// Advance the viewport past the given item so the next timeline chunk
    /// renders.
    async fn advance_past(&mut self, seq: u64) -> Result<(), CrawlError>;

    /// Navigate to a detail-page permalink and return the single visible
    /// item, if any rendered.
    async fn open_detail(&mut self, permalink: &str)
        -> Result<Option<FeedItemSnapshot>, CrawlError>;
}

// ── CDP adapter ──────────────────────────────────────────────────────────────

/// Collects every `article` into a JSON array, assigning `data-ps-seq` tags
/// to elements seen for the first time. Returned as a JSON string so the
/// payload always comes back by value.
const SNAPSHOT_SCRIPT: &str = r#"() => {
    if (!window.__psSeq) { window.__psSeq = 1; }
    const items = [];
    for (const el of document.querySelectorAll('article')) {
        if (!el.dataset.psSeq) { el.dataset.psSeq = String(window.__psSeq++); }
        const time = el.querySelector('time');
        const anchor = time ? time.closest('a') : null;
        items.push({
            seq: Number(el.dataset.psSeq),
            text: el.innerText || '',
            links: Array.from(el.querySelectorAll('a[href]')).map(a => a.href),
            images: Array.from(el.querySelectorAll('img[src]')).map(i => i.src),
            permalink: anchor ? anchor.href : null,
        });
    }
    return JSON.stringify(items);
}"#;

/// [`FeedView`] adapter driving a CDP page through the shared [`Navigator`].
pub struct CdpFeedView<'a> {
    nav: &'a mut Navigator,
}

impl<'a> CdpFeedView<'a> {
    pub fn new(nav: &'a mut Navigator) -> Self {
        Self { nav }
    }

    async fn eval_string(&self, script: String) -> Result<String, CrawlError> {
        let value = self
            .nav
            .page()
            .evaluate(script)
            .await
            .map_err(|e| CrawlError::SessionLost(e.to_string()))?;
        value
            .into_value::<String>()
            .map_err(|e| CrawlError::SessionLost(format!("evaluate returned no value: {e}")))
    }

    async fn read_items(&self) -> Result<Vec<FeedItemSnapshot>, CrawlError> {
        let json = self.eval_string(SNAPSHOT_SCRIPT.to_string()).await?;
        serde_json::from_str(&json)
            .map_err(|e| CrawlError::SessionLost(format!("unreadable feed snapshot: {e}")))
    }
}

#[async_trait]
impl FeedView for CdpFeedView<'_> {
    async fn snapshot(&mut self) -> Result<Vec<FeedItemSnapshot>, CrawlError> {
        let items = self.read_items().await?;
        debug!("snapshot: {} rendered feed items", items.len());
        Ok(items)
    }

    async fn move_viewport_to(&mut self, seq: u64) -> Result<(), CrawlError> {
        let script = format!(
            r#"() => {{
    const el = document.querySelector('article[data-ps-seq="{seq}"]');
    if (!el) return "gone";
    el.scrollIntoView({{block: 'center'}});
    return "ok";
}}"#
        );
        match self.eval_string(script).await?.as_str() {
            "ok" => Ok(()),
            _ => Err(CrawlError::StaleView { seq }),
        }
    }

    async fn advance_past(&mut self, seq: u64) -> Result<(), CrawlError> {
        let script = format!(
            r#"() => {{
    const el = document.querySelector('article[data-ps-seq="{seq}"]');
    if (el) {{ el.scrollIntoView({{block: 'end'}}); }}
    window.scrollBy({{top: Math.round(window.innerHeight / 2), behavior: 'smooth'}});
    return "ok";
}}"#
        );
        self.eval_string(script).await?;
        tokio::time::sleep(Duration::from_millis(SCROLL_SETTLE_MS)).await;
        Ok(())
    }

    async fn open_detail(
        &mut self,
        permalink: &str,
    ) -> Result<Option<FeedItemSnapshot>, CrawlError> {
        self.nav
            .goto(permalink)
            .await
            .map_err(|e| CrawlError::SessionLost(e.to_string()))?;
        let items = self.read_items().await?;
        Ok(items.into_iter().next())
    }
}
