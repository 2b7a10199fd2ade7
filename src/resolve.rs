//! Link-shortener resolution.
//!
//! Feed items reference papers through the platform's `t.co` wrapper. The
//! resolver follows redirects to the real destination with a bounded retry,
//! and degrades to the original URL on failure: resolution must never
//! abort a crawl.

use anyhow::anyhow;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP statuses worth a second attempt. Anything else is taken at face
/// value; the redirect chain has already been followed by then.
const RETRYABLE_STATUS: &[u16] = &[429, 500, 502, 503, 504];

#[async_trait]
pub trait ResolveUrl: Send + Sync {
    /// Whether this URL goes through a known shortener domain.
    fn is_shortened(&self, url: &str) -> bool;

    /// Follow redirects to the final destination. Infallible by contract:
    /// on persistent failure the original URL is returned unchanged.
    async fn resolve(&self, url: &str) -> String;
}

/// Resolver backed by the invocation-scoped `reqwest` client.
pub struct RedirectResolver {
    client: reqwest::Client,
    shortener_domains: Vec<String>,
}

impl RedirectResolver {
    pub fn new(client: reqwest::Client, shortener_domains: Vec<String>) -> Self {
        Self {
            client,
            shortener_domains,
        }
    }
}

#[async_trait]
impl ResolveUrl for RedirectResolver {
    fn is_shortened(&self, url: &str) -> bool {
        let Some(host) = url::Url::parse(url).ok().and_then(|u| {
            u.host_str().map(|h| h.to_ascii_lowercase())
        }) else {
            return false;
        };
        self.shortener_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    async fn resolve(&self, url: &str) -> String {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(Duration::from_secs(3)))
            .build();

        let attempt = || async {
            match self.client.get(url).send().await {
                Ok(resp) if RETRYABLE_STATUS.contains(&resp.status().as_u16()) => Err(
                    backoff::Error::transient(anyhow!("retryable status {}", resp.status())),
                ),
                Ok(resp) => Ok(resp.url().to_string()),
                // Transport failures are not retried; degrade immediately.
                Err(e) => Err(backoff::Error::permanent(anyhow!(e))),
            }
        };

        match retry(policy, attempt).await {
            Ok(resolved) => {
                debug!("resolved {} -> {}", url, resolved);
                resolved
            }
            Err(e) => {
                warn!("failed to resolve {}: {} — keeping original URL", url, e);
                url.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(domains: &[&str]) -> RedirectResolver {
        RedirectResolver::new(
            reqwest::Client::new(),
            domains.iter().map(|d| d.to_string()).collect(),
        )
    }

    #[test]
    fn shortener_match_is_host_scoped() {
        let r = resolver(&["t.co"]);
        assert!(r.is_shortened("https://t.co/AbC123"));
        assert!(r.is_shortened("https://www.t.co/AbC123"));
        // Substring of the path or of another host must not count.
        assert!(!r.is_shortened("https://example.com/t.co/decoy"));
        assert!(!r.is_shortened("https://not-t.co.example.com/x"));
        assert!(!r.is_shortened("not a url"));
    }
}
