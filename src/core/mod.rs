pub mod config;
pub mod types;

/// Per-invocation shared state: the outbound HTTP client used for redirect
/// resolution and the loaded configuration. Constructed once in `main`,
/// dropped when the invocation ends.
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: config::ScoutConfig,
}

impl AppState {
    pub fn new(http_client: reqwest::Client, config: config::ScoutConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }
}
