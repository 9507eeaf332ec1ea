//! ODDSCOPE: Bookmaker odds comparison for API-Football fixtures
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the API-Football client and serves the comparison UI and
//! JSON API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use oddscope::config::AppConfig;
use oddscope::data::api_football::ApiFootballClient;
use oddscope::data::OddsSource;
use oddscope::server::{self, ServerState};

const BANNER: &str = r#"
  ___  ____  ____  ____   ____ ___  ____  _____
 / _ \|  _ \|  _ \/ ___| / ___/ _ \|  _ \| ____|
| | | | | | | | | \___ \| |  | | | | |_) |  _|
| |_| | |_| | |_| |___) | |__| |_| |  __/| |___
 \___/|____/|____/|____/ \____\___/|_|   |_____|

  Side-by-side bookmaker odds for API-Football
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let mut cfg = AppConfig::load_or_default("config.toml")?;
    cfg.apply_env_overrides()?;

    println!("{BANNER}");
    info!(
        host = %cfg.server.host,
        port = cfg.server.port,
        api_base = %cfg.api.base_url,
        min_percent_diff = cfg.comparison.min_percent_diff,
        reference = %cfg.comparison.reference,
        "ODDSCOPE starting up"
    );

    // -- API client ------------------------------------------------------

    let source: Option<Arc<dyn OddsSource>> = match cfg.api.resolve_api_key() {
        Ok(key) => {
            let client: Arc<dyn OddsSource> = Arc::new(ApiFootballClient::new(
                key,
                Some(cfg.api.base_url.clone()),
                cfg.api.timeout(),
            )?);
            Some(client)
        }
        Err(e) => {
            warn!(
                error = %e,
                "No API key configured, API routes will answer 500 until {} is set",
                cfg.api.api_key_env
            );
            None
        }
    };

    // -- Serve -----------------------------------------------------------

    let state = Arc::new(
        ServerState::new(source, cfg.comparison.clone()).with_api_key_env(&cfg.api.api_key_env),
    );
    server::serve(state, &cfg.server).await?;

    info!("ODDSCOPE shut down cleanly");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oddscope=info"));

    let json_logging = std::env::var("ODDSCOPE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
