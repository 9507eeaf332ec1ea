//! Odds data sources.
//!
//! Defines the `OddsSource` trait the comparator and the server depend
//! on, and the API-Football implementation.

pub mod api_football;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::OddsPayload;

/// Filters for the fixtures lookup. Unset fields are not sent upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureQuery {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    pub league: Option<i64>,
    pub season: Option<i32>,
}

impl FixtureQuery {
    /// Query-string pairs for the upstream request.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(date) = &self.date {
            params.push(("date", date.clone()));
        }
        if let Some(league) = self.league {
            params.push(("league", league.to_string()));
        }
        if let Some(season) = self.season {
            params.push(("season", season.to_string()));
        }
        params
    }
}

/// Abstraction over where fixture odds come from.
///
/// Failures are transport-level (network, HTTP status, undecodable body)
/// and are not classified further.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// Odds of every bookmaker for one fixture.
    async fn fetch_odds(&self, fixture_id: i64) -> Result<OddsPayload>;

    /// Fixture listing, returned as the upstream JSON.
    async fn fetch_fixtures(&self, query: &FixtureQuery) -> Result<Value>;

    /// Bookmaker listing, returned as the upstream JSON.
    async fn fetch_bookmakers(&self) -> Result<Value>;
}
