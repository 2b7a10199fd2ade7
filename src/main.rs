use anyhow::anyhow;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use paper_scout::{browser_manager, config, ingest, AppState, IngestReport, JsonlStore, Navigator, RedirectResolver};

struct CliArgs {
    since: Option<String>,
    budget: Option<usize>,
    store: Option<String>,
    queries: Vec<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut cli = CliArgs {
        since: None,
        budget: None,
        store: None,
        queries: Vec::new(),
    };
    let mut args = std::env::args().skip(1).peekable();
    while let Some(a) = args.next() {
        if let Some(v) = a.strip_prefix("--since=") {
            cli.since = Some(v.to_string());
        } else if a == "--since" {
            cli.since = args.next();
        } else if let Some(v) = a.strip_prefix("--budget=") {
            cli.budget = v.parse().ok();
        } else if a == "--budget" {
            cli.budget = args.next().and_then(|v| v.parse().ok());
        } else if let Some(v) = a.strip_prefix("--store=") {
            cli.store = Some(v.to_string());
        } else if a == "--store" {
            cli.store = args.next();
        } else if let Some(v) = a.strip_prefix("--query=") {
            cli.queries.push(v.to_string());
        } else if a == "--query" {
            if let Some(v) = args.next() {
                cli.queries.push(v);
            }
        } else {
            warn!("ignoring unknown argument: {}", a);
        }
    }
    cli
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = parse_cli_args();

    let mut scout_config = config::load_scout_config();
    if let Some(budget) = cli.budget {
        scout_config.crawl_budget = Some(budget);
    }
    if let Some(store) = cli.store.clone() {
        scout_config.store_path = Some(store);
    }
    if !cli.queries.is_empty() {
        scout_config.queries = Some(cli.queries.clone());
    }

    let since = cli
        .since
        .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());

    // Outbound HTTP client (redirect resolution)
    let http_timeout = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(http_timeout))
        .connect_timeout(Duration::from_secs(connect_timeout))
        .build()?;

    let state = AppState::new(http_client, scout_config);

    let queries = state.config.resolve_queries();
    let settle = Duration::from_millis(state.config.resolve_settle_ms());
    let store_path = state.config.resolve_store_path();

    info!(
        "starting ingest: {} queries, budget {}, since {}",
        queries.len(),
        state.config.resolve_budget(),
        since
    );

    let exe = browser_manager::find_chrome_executable().ok_or_else(|| {
        anyhow!(
            "No browser found. Install Chrome or Chromium, or point CHROME_EXECUTABLE at one."
        )
    })?;
    let (mut browser, handler_task) =
        browser_manager::launch(&exe, !state.config.headful()).await?;

    let run = async {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("failed to open tab: {e}"))?;
        browser_manager::apply_network_filters(&page).await;

        let mut nav = Navigator::new(page, settle);
        let resolver =
            RedirectResolver::new(state.http_client.clone(), state.config.resolve_shorteners());
        let mut store = JsonlStore::open(&store_path)?;

        let mut report = IngestReport::default();
        for query in &queries {
            let page_report =
                ingest::ingest_query(&state, &mut nav, &resolver, &mut store, query, &since)
                    .await?;
            report.pages.push(page_report);
        }
        Ok::<IngestReport, anyhow::Error>(report)
    }
    .await;

    // Best-effort cleanup — don't let a close error shadow the run error
    if let Err(e) = browser.close().await {
        warn!("Browser close error (non-fatal): {}", e);
    }
    handler_task.abort();

    let report = run?;
    for page in &report.pages {
        info!(
            "{}: {} accepted, {} enriched, {} stored",
            page.query, page.accepted, page.enriched, page.stored
        );
    }
    info!(
        "ingest complete: {} mentions accepted, {} stored across {} pages",
        report.accepted(),
        report.stored(),
        report.pages.len()
    );

    Ok(())
}
