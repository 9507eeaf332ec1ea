//! Odds comparison between two bookmakers.
//!
//! `OddsComparator::compare_odds` fetches one fixture's odds, extracts the
//! two bookmakers and merges their markets:
//!
//! ```text
//! fetch_odds ─▶ extract(bm1), extract(bm2) ─▶ merge_markets ─▶ ComparisonResult
//! ```

pub mod extractor;
pub mod merge;
pub mod policy;

use std::sync::Arc;
use tracing::{debug, info};

use crate::data::OddsSource;
use crate::types::{BookmakerRole, CompareError, ComparisonResult, OddsPayload};

pub use extractor::extract_bookmaker;
pub use merge::merge_markets;
pub use policy::{ComparisonPolicy, MalformedOddPolicy};

pub struct OddsComparator {
    source: Arc<dyn OddsSource>,
    policy: ComparisonPolicy,
}

impl OddsComparator {
    pub fn new(source: Arc<dyn OddsSource>, policy: ComparisonPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &ComparisonPolicy {
        &self.policy
    }

    /// Compare two bookmakers on one fixture.
    ///
    /// Makes exactly one `fetch_odds` call. Retrieval failures come back
    /// as `CompareError::Transport`.
    pub async fn compare_odds(
        &self,
        fixture_id: i64,
        bookmaker1_id: i64,
        bookmaker2_id: i64,
    ) -> Result<ComparisonResult, CompareError> {
        info!(fixture_id, bookmaker1_id, bookmaker2_id, "Comparing odds");

        let payload = self.source.fetch_odds(fixture_id).await?;
        let result = compare_payload(&payload, fixture_id, bookmaker1_id, bookmaker2_id, &self.policy)?;

        info!(
            fixture_id,
            markets = result.comparisons.len(),
            rows = result.row_count(),
            "Comparison complete"
        );
        Ok(result)
    }
}

/// The pure part of the comparison, on an already fetched payload.
pub fn compare_payload(
    payload: &OddsPayload,
    fixture_id: i64,
    bookmaker1_id: i64,
    bookmaker2_id: i64,
    policy: &ComparisonPolicy,
) -> Result<ComparisonResult, CompareError> {
    let fixture = payload
        .first_fixture()
        .ok_or(CompareError::NoOddsData { fixture_id })?;

    debug!(
        fixture_id,
        bookmakers = fixture.bookmakers.len(),
        league = ?fixture.league.get("name"),
        "Odds payload received"
    );

    let bookmaker1 = extract_bookmaker(payload, bookmaker1_id);
    let bookmaker2 = extract_bookmaker(payload, bookmaker2_id);

    let bookmaker1 = bookmaker1.ok_or(CompareError::BookmakerNotFound {
        fixture_id,
        bookmaker_id: bookmaker1_id,
        role: BookmakerRole::Bookmaker1,
    })?;
    let bookmaker2 = bookmaker2.ok_or(CompareError::BookmakerNotFound {
        fixture_id,
        bookmaker_id: bookmaker2_id,
        role: BookmakerRole::Bookmaker2,
    })?;

    let comparisons = merge_markets(bookmaker1, bookmaker2, policy)?;

    Ok(ComparisonResult {
        fixture_id,
        fixture: fixture.fixture.clone(),
        league: fixture.league.clone(),
        bookmaker1: bookmaker1.into(),
        bookmaker2: bookmaker2.into(),
        comparisons,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
