use crate::core::types::RecognizedSource;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ScoutConfig — file-based config loader (paper-scout.json) with env-var
// fallbacks. Precedence per field: JSON field → env var → default.
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "PAPER_SCOUT_CONFIG";
pub const ENV_BUDGET: &str = "PAPER_SCOUT_BUDGET";
pub const ENV_SETTLE_MS: &str = "PAPER_SCOUT_SETTLE_MS";
pub const ENV_STORE_PATH: &str = "PAPER_SCOUT_STORE";
pub const ENV_USERNAME: &str = "PAPER_SCOUT_USERNAME";
pub const ENV_PASSWORD: &str = "PAPER_SCOUT_PASSWORD";
pub const ENV_HEADFUL: &str = "PAPER_SCOUT_HEADFUL";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Search queries crawled when none are configured. `{since}` is replaced
/// with the run's since-date before templating into the search URL.
const DEFAULT_QUERIES: &[&str] = &[
    "arxiv.org llms filter:links since:{since}",
    "huggingface.co/papers filter:links since:{since}",
];

const DEFAULT_SHORTENERS: &[&str] = &["t.co"];

const DEFAULT_BUDGET: usize = 40;
const DEFAULT_SETTLE_MS: u64 = 5_000;

/// Social-network credentials, used only when a login interstitial appears.
/// Env-only on purpose; they never live in the config file and are never
/// logged.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Top-level config loaded from `paper-scout.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Ordered search queries, `{since}` placeholder allowed.
    pub queries: Option<Vec<String>>,
    /// Max accepted mentions per search page.
    pub crawl_budget: Option<usize>,
    /// Recognized-source allow-list (name + URL pattern).
    pub sources: Option<Vec<RecognizedSource>>,
    /// Link-shortener domains resolved before source matching.
    pub shorteners: Option<Vec<String>>,
    /// Post-navigation settle wait in milliseconds.
    pub settle_ms: Option<u64>,
    /// JSONL store location.
    pub store_path: Option<String>,
}

impl ScoutConfig {
    pub fn resolve_queries(&self) -> Vec<String> {
        if let Some(qs) = &self.queries {
            if !qs.is_empty() {
                return qs.clone();
            }
        }
        DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
    }

    /// Crawl budget: JSON field → `PAPER_SCOUT_BUDGET` env var → 40.
    pub fn resolve_budget(&self) -> usize {
        if let Some(n) = self.crawl_budget {
            return n;
        }
        std::env::var(ENV_BUDGET)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_BUDGET)
    }

    pub fn resolve_sources(&self) -> Vec<RecognizedSource> {
        if let Some(sources) = &self.sources {
            if !sources.is_empty() {
                return sources.clone();
            }
        }
        vec![
            RecognizedSource::new("arxiv", "arxiv.org"),
            RecognizedSource::new("huggingface", "huggingface.co"),
            RecognizedSource::new("meta-ai", "ai.meta.com"),
        ]
    }

    pub fn resolve_shorteners(&self) -> Vec<String> {
        if let Some(domains) = &self.shorteners {
            if !domains.is_empty() {
                return domains.clone();
            }
        }
        DEFAULT_SHORTENERS.iter().map(|d| d.to_string()).collect()
    }

    /// Settle delay: JSON field → `PAPER_SCOUT_SETTLE_MS` env var → 5000.
    pub fn resolve_settle_ms(&self) -> u64 {
        if let Some(ms) = self.settle_ms {
            return ms;
        }
        std::env::var(ENV_SETTLE_MS)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_SETTLE_MS)
    }

    /// Store path: JSON field → `PAPER_SCOUT_STORE` env var →
    /// `~/.paper-scout/mentions.jsonl`.
    pub fn resolve_store_path(&self) -> PathBuf {
        if let Some(p) = &self.store_path {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        if let Ok(p) = std::env::var(ENV_STORE_PATH) {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        crate::store::JsonlStore::default_path()
    }

    /// Both `PAPER_SCOUT_USERNAME` and `PAPER_SCOUT_PASSWORD` must be set.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = std::env::var(ENV_USERNAME).ok()?.trim().to_string();
        let password = std::env::var(ENV_PASSWORD).ok()?.trim().to_string();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credentials { username, password })
    }

    /// Headless is the default; set `PAPER_SCOUT_HEADFUL=1` to watch the
    /// crawl in a visible window.
    pub fn headful(&self) -> bool {
        let Ok(v) = std::env::var(ENV_HEADFUL) else {
            return false;
        };
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    }
}

/// Load `paper-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `PAPER_SCOUT_CONFIG` env var path
/// 2. `./paper-scout.json` (process cwd)
/// 3. `../paper-scout.json` (one level up)
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks
/// apply). Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<PathBuf> = {
        let mut v = vec![
            PathBuf::from("paper-scout.json"),
            PathBuf::from("../paper-scout.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScoutConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("paper-scout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "paper-scout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return ScoutConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    ScoutConfig::default()
}

// ---------------------------------------------------------------------------

/// Render a templated query into the full search-results URL.
///
/// `{since}` is replaced first, then the whole query is percent-encoded
/// into `https://x.com/search?q=...&src=typed_query&f=top`.
pub fn search_url(query: &str, since: &str) -> String {
    let rendered = query.replace("{since}", since);
    let encoded = utf8_percent_encode(&rendered, NON_ALPHANUMERIC);
    format!("https://x.com/search?q={encoded}&src=typed_query&f=top")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_templates_and_encodes_the_query() {
        let url = search_url("arxiv.org llms filter:links since:{since}", "2023-07-10");
        assert!(url.starts_with("https://x.com/search?q="));
        assert!(url.ends_with("&src=typed_query&f=top"));
        assert!(!url.contains("{since}"));
        assert!(!url.contains(' '));
        // The rendered since-date survives encoding.
        assert!(url.contains("2023"));
        assert!(url.contains("%20"));
    }

    #[test]
    fn defaults_cover_both_bundled_queries() {
        let cfg = ScoutConfig::default();
        let queries = cfg.resolve_queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("arxiv.org"));
        assert!(queries[1].contains("huggingface.co/papers"));
        assert_eq!(cfg.resolve_shorteners(), vec!["t.co"]);
        assert_eq!(cfg.resolve_sources().len(), 3);
    }

    #[test]
    fn config_file_fields_win_over_defaults() {
        let cfg: ScoutConfig = serde_json::from_str(
            r#"{
                "queries": ["site:example.org {since}"],
                "crawl_budget": 7,
                "shorteners": ["t.co", "bit.ly"],
                "sources": [{"name": "acme", "pattern": "papers.acme.dev"}]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.resolve_queries(), vec!["site:example.org {since}"]);
        assert_eq!(cfg.resolve_budget(), 7);
        assert_eq!(cfg.resolve_shorteners(), vec!["t.co", "bit.ly"]);
        assert_eq!(cfg.resolve_sources()[0].name, "acme");
    }
}
