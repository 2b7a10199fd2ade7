//! Feed-item record parsing.
//!
//! Converts one rendered feed item into a [`Mention`], or signals that the
//! item needs a detail-page pass ("Show more" truncation) or is not a paper
//! mention at all. Rejection is the common case on a search timeline and is
//! never an error.

use crate::core::types::{Mention, RecognizedSource};
use crate::crawl::views::normalize_view_count;
use crate::resolve::ResolveUrl;
use crate::scraping::feed::FeedItemSnapshot;
use std::fmt;
use tracing::debug;

/// Trailing marker on sponsored items.
const PROMOTED_MARKER: &str = "Promoted";
/// Inline affordance rendered when the item text is truncated in list view.
const TRUNCATION_AFFORDANCE: &str = "Show more";
/// Label preceding the view counter on a detail page.
const VIEWS_LABEL: &str = "Views";

/// Which rendering of the item is being parsed. The view counter lives in a
/// different position in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Search-results timeline: the counter is the last text line.
    List,
    /// Single-post permalink page: the counter follows the "Views" label,
    /// scanned from the end past the page chrome.
    Detail,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RejectReason {
    Promoted,
    Malformed(&'static str),
    NoQualifyingLink,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Promoted => write!(f, "promoted item"),
            RejectReason::Malformed(what) => write!(f, "malformed item: {what}"),
            RejectReason::NoQualifyingLink => write!(f, "no qualifying outbound link"),
        }
    }
}

#[derive(Debug)]
pub enum ParseOutcome {
    Mention(Mention),
    /// Text was truncated; revisit the permalink page to read it in full.
    NeedsDetail { permalink: String },
    Rejected(RejectReason),
}

/// Parse one rendered feed item.
///
/// Shortened outbound links are resolved before matching; the first link
/// whose resolved form contains a recognized-source pattern *and* points
/// deeper than the domain root wins.
pub async fn parse_feed_item(
    item: &FeedItemSnapshot,
    sources: &[RecognizedSource],
    mode: ViewMode,
    resolver: &dyn ResolveUrl,
) -> ParseOutcome {
    use self::ParseOutcome::{Mention as Accepted, NeedsDetail, Rejected};

    if item.text.trim_end().ends_with(PROMOTED_MARKER) {
        return Rejected(RejectReason::Promoted);
    }

    let lines: Vec<&str> = item.text.lines().collect();
    if lines.len() < 2 {
        return Rejected(RejectReason::Malformed("fewer than 2 text lines"));
    }
    let author_handle = lines[1].strip_prefix('@').unwrap_or(lines[1]).to_string();

    let Some(profile_image_url) = item.images.first().cloned() else {
        return Rejected(RejectReason::Malformed("no profile image"));
    };
    let embedded_image_url = item.images.get(1).cloned();

    let mut target: Option<(String, String)> = None;
    'links: for href in &item.links {
        let resolved = if resolver.is_shortened(href) {
            resolver.resolve(href).await
        } else {
            href.clone()
        };
        for source in sources {
            if resolved.contains(&source.pattern) && has_deep_path(&resolved) {
                target = Some((resolved, source.name.clone()));
                break 'links;
            }
        }
    }
    let Some((target_url, matched_source)) = target else {
        return Rejected(RejectReason::NoQualifyingLink);
    };

    // The truncated rendering hides the tail of the text, so the counter
    // line position is display-dependent and must not be trusted here.
    if lines.iter().any(|l| l.trim() == TRUNCATION_AFFORDANCE) {
        let Some(permalink) = item.permalink.clone() else {
            return Rejected(RejectReason::Malformed("truncated item without permalink"));
        };
        return NeedsDetail { permalink };
    }

    let counter_line = match mode {
        ViewMode::List => lines.last().copied(),
        ViewMode::Detail => lines
            .iter()
            .rposition(|l| l.trim() == VIEWS_LABEL)
            .and_then(|idx| lines.get(idx + 1).copied()),
    };
    let Some(counter_line) = counter_line else {
        return Rejected(RejectReason::Malformed("view counter not found"));
    };
    let view_count = match normalize_view_count(counter_line) {
        Ok(n) => n,
        Err(e) => {
            debug!("item {}: {}", item.seq, e);
            return Rejected(RejectReason::Malformed("unparseable view counter"));
        }
    };

    Accepted(Mention {
        raw_text: item.text.clone(),
        author_handle,
        profile_image_url,
        embedded_image_url,
        target_url,
        matched_source,
        view_count,
        metadata: None,
    })
}

/// A resolved URL qualifies only when it points past the domain root;
/// "https://arxiv.org" alone never identifies a paper.
fn has_deep_path(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    match parsed.path_segments() {
        Some(segments) => segments.filter(|s| !s.is_empty()).count() > 1,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Resolver fixture: maps shortened URLs to destinations, no network.
    pub(crate) struct StaticResolver {
        map: HashMap<String, String>,
    }

    impl StaticResolver {
        pub(crate) fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                map: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ResolveUrl for StaticResolver {
        fn is_shortened(&self, url: &str) -> bool {
            self.map.contains_key(url)
        }

        async fn resolve(&self, url: &str) -> String {
            self.map.get(url).cloned().unwrap_or_else(|| url.to_string())
        }
    }

    fn sources() -> Vec<RecognizedSource> {
        vec![
            RecognizedSource::new("arxiv", "arxiv.org"),
            RecognizedSource::new("huggingface", "huggingface.co"),
        ]
    }

    fn item(text: &str, links: &[&str], images: &[&str]) -> FeedItemSnapshot {
        FeedItemSnapshot {
            seq: 1,
            text: text.to_string(),
            links: links.iter().map(|s| s.to_string()).collect(),
            images: images.iter().map(|s| s.to_string()).collect(),
            permalink: Some("https://x.com/someone/status/1".to_string()),
        }
    }

    #[tokio::test]
    async fn accepts_a_plain_arxiv_mention() {
        let it = item(
            "Some Person\n@someone\nnew paper!\nhttps://arxiv.org/abs/2301.00001\n1.2K",
            &["https://x.com/someone", "https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/profile.jpg", "https://pbs.example/card.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        match out {
            ParseOutcome::Mention(m) => {
                assert_eq!(m.author_handle, "someone");
                assert_eq!(m.target_url, "https://arxiv.org/abs/2301.00001");
                assert_eq!(m.matched_source, "arxiv");
                assert_eq!(m.view_count, 1_200);
                assert_eq!(m.profile_image_url, "https://pbs.example/profile.jpg");
                assert_eq!(
                    m.embedded_image_url.as_deref(),
                    Some("https://pbs.example/card.jpg")
                );
                assert!(m.metadata.is_none());
            }
            other => panic!("expected Mention, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_promoted_items() {
        let it = item(
            "Brand\n@brand\nbuy things\nPromoted",
            &["https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::Promoted)
        ));
    }

    #[tokio::test]
    async fn rejects_items_with_too_few_lines() {
        let it = item("just one line", &[], &["https://pbs.example/p.jpg"]);
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::Malformed("fewer than 2 text lines"))
        ));
    }

    #[tokio::test]
    async fn rejects_items_without_profile_image() {
        let it = item(
            "A\n@a\nhttps://arxiv.org/abs/2301.00001\n12",
            &["https://arxiv.org/abs/2301.00001"],
            &[],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::Malformed("no profile image"))
        ));
    }

    #[tokio::test]
    async fn bare_domain_root_never_qualifies() {
        let it = item(
            "A\n@a\ncheck out arxiv\n12",
            &["https://arxiv.org", "https://arxiv.org/"],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::NoQualifyingLink)
        ));
    }

    #[tokio::test]
    async fn single_segment_path_does_not_qualify() {
        let it = item(
            "A\n@a\nlink\n12",
            &["https://arxiv.org/abs"],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::NoQualifyingLink)
        ));
    }

    #[tokio::test]
    async fn shortened_links_resolve_before_matching() {
        let resolver = StaticResolver::new(&[(
            "https://t.co/AbC123",
            "https://huggingface.co/papers/2301.99999",
        )]);
        let it = item(
            "A\n@a\ngreat paper\n45,000",
            &["https://t.co/AbC123"],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &resolver).await;
        match out {
            ParseOutcome::Mention(m) => {
                assert_eq!(m.target_url, "https://huggingface.co/papers/2301.99999");
                assert_eq!(m.matched_source, "huggingface");
                assert_eq!(m.view_count, 45_000);
            }
            other => panic!("expected Mention, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_qualifying_link_wins_in_dom_order() {
        let it = item(
            "A\n@a\ntwo links\n10",
            &[
                "https://arxiv.org/abs/2301.00001",
                "https://huggingface.co/papers/2301.00002",
            ],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        match out {
            ParseOutcome::Mention(m) => assert_eq!(m.matched_source, "arxiv"),
            other => panic!("expected Mention, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_items_defer_to_the_detail_pass() {
        let it = item(
            "A\n@a\nlong text cut off\nShow more\nhttps://arxiv.org/abs/2301.00001\n99",
            &["https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        match out {
            ParseOutcome::NeedsDetail { permalink } => {
                assert_eq!(permalink, "https://x.com/someone/status/1");
            }
            other => panic!("expected NeedsDetail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_item_without_permalink_is_malformed() {
        let mut it = item(
            "A\n@a\ncut\nShow more\n12",
            &["https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/p.jpg"],
        );
        it.permalink = None;
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::Malformed("truncated item without permalink"))
        ));
    }

    #[tokio::test]
    async fn detail_mode_reads_the_line_after_the_views_label() {
        let it = item(
            "A\n@a\nfull text now visible\nhttps://arxiv.org/abs/2301.00001\n9:01 AM\n1.5M\nViews\n3.2K",
            &["https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/p.jpg"],
        );
        let out =
            parse_feed_item(&it, &sources(), ViewMode::Detail, &StaticResolver::new(&[])).await;
        match out {
            ParseOutcome::Mention(m) => assert_eq!(m.view_count, 3_200),
            other => panic!("expected Mention, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn detail_mode_without_views_label_is_malformed() {
        let it = item(
            "A\n@a\nfull text\nhttps://arxiv.org/abs/2301.00001",
            &["https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/p.jpg"],
        );
        let out =
            parse_feed_item(&it, &sources(), ViewMode::Detail, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::Malformed("view counter not found"))
        ));
    }

    #[tokio::test]
    async fn unparseable_list_counter_is_malformed() {
        let it = item(
            "A\n@a\nhttps://arxiv.org/abs/2301.00001\nnot a number",
            &["https://arxiv.org/abs/2301.00001"],
            &["https://pbs.example/p.jpg"],
        );
        let out = parse_feed_item(&it, &sources(), ViewMode::List, &StaticResolver::new(&[])).await;
        assert!(matches!(
            out,
            ParseOutcome::Rejected(RejectReason::Malformed("unparseable view counter"))
        ));
    }
}
