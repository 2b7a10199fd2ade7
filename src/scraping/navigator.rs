//! One CDP page with memoized navigation.
//!
//! The detail pass can queue the same permalink the navigator is already
//! showing (or navigate chains of permalinks interleaved with enrichment
//! pages); memoizing the last successfully loaded URL skips those redundant
//! reloads and their settle waits.

use anyhow::{anyhow, Result};
use chromiumoxide::Page;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

pub struct Navigator {
    page: Page,
    /// Fixed wait after navigation for client-side rendering to complete.
    settle: Duration,
    last_url: Option<String>,
}

impl Navigator {
    pub fn new(page: Page, settle: Duration) -> Self {
        Self {
            page,
            settle,
            last_url: None,
        }
    }

    /// Navigate to `url`, then sleep the settle delay. A no-op when the page
    /// is already showing that exact URL.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        if self.last_url.as_deref() == Some(url) {
            debug!("navigator: already on {url}, skipping reload");
            return Ok(());
        }
        // Until the new load succeeds the page state is unknown.
        self.last_url = None;
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("navigation to {url} failed: {e}"))?;
        sleep(self.settle).await;
        self.last_url = Some(url.to_string());
        Ok(())
    }

    /// Forget the memoized URL so the next `goto` reloads unconditionally.
    /// Needed after scripted interactions (login fill) mutate page state
    /// without a navigation.
    pub fn forget(&mut self) {
        self.last_url = None;
    }

    /// Current rendered HTML.
    pub async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("failed to read page content: {e}"))
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}
