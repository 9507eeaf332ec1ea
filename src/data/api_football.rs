//! API-Football odds provider.
//!
//! API: `https://v3.football.api-sports.io/`
//! Auth: `x-apisports-key` header. Free tier: 100 req/day.
//!
//! Endpoints used:
//! - `GET /odds?fixture={id}`: pre-match odds for every bookmaker
//! - `GET /fixtures?date=&league=&season=`: fixture listing
//! - `GET /odds/bookmakers`: bookmaker ids and names

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{FixtureQuery, OddsSource};
use crate::types::OddsPayload;

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
const API_KEY_HEADER: &str = "x-apisports-key";

pub struct ApiFootballClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl ApiFootballClient {
    /// Create a client. `base_url` defaults to the public API host.
    pub fn new(api_key: SecretString, base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("ODDSCOPE/0.1.0")
            .build()
            .context("Failed to build API-Football HTTP client")?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` with `params` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = self.endpoint(path);
        debug!(url = %url, ?params, "Fetching {what}");

        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret().as_str())
            .query(params)
            .send()
            .await
            .with_context(|| format!("Error fetching {what}"))?;

        let status = resp.status();
        debug!(url = %url, %status, "API-Football responded");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Error fetching {what}: API error {status}: {body}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }
}

#[async_trait]
impl OddsSource for ApiFootballClient {
    async fn fetch_odds(&self, fixture_id: i64) -> Result<OddsPayload> {
        let payload: OddsPayload = self
            .get_json("odds", &[("fixture", fixture_id.to_string())], "odds")
            .await?;

        if payload.has_api_errors() {
            warn!(fixture_id, errors = %payload.errors, "API-Football reported errors");
        }
        debug!(fixture_id, results = payload.response.len(), "Odds fetched");

        Ok(payload)
    }

    async fn fetch_fixtures(&self, query: &FixtureQuery) -> Result<Value> {
        self.get_json("fixtures", &query.params(), "fixtures").await
    }

    async fn fetch_bookmakers(&self) -> Result<Value> {
        self.get_json("odds/bookmakers", &[], "bookmakers").await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
