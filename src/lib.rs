pub mod core;
pub mod crawl;
pub mod enrich;
pub mod ingest;
pub mod resolve;
pub mod scraping;
pub mod store;

// --- Primary core exports ---
pub use core::config;
pub use core::types;
pub use core::types::*;
pub use core::AppState;

// --- Crawl pipeline ---
pub use crawl::record::{parse_feed_item, ParseOutcome, RejectReason, ViewMode};
pub use crawl::views::normalize_view_count;
pub use crawl::{crawl_feed, CrawlContext, CrawlError};
pub use enrich::{enrich_mention, enrich_mentions, EnrichError, FetchPage};
pub use resolve::{RedirectResolver, ResolveUrl};
pub use scraping::browser_manager;
pub use scraping::feed::{CdpFeedView, FeedItemSnapshot, FeedView};
pub use scraping::navigator::Navigator;
pub use store::{JsonlStore, MentionStore};
