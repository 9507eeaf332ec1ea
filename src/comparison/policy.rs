//! Report policy.
//!
//! Which markets are skipped, which rows are worth reporting, and what to
//! do with unparsable odds. Loaded from the `[comparison]` section of
//! `config.toml`; the defaults reproduce the stock behavior.

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::types::{BetMarket, Better, BookmakerRole};

/// Markets whose outcome shapes differ too much between books to compare.
pub const DEFAULT_EXCLUDED_MARKETS: &[&str] = &[
    "HT/FT Double",
    "Exact Score",
    "Odd/Even",
    "Correct Score - First Half",
];

/// Outcome-label prefix marking three-way lines (Over/Under/Exactly).
pub const DEFAULT_EXCLUDED_VALUE_PREFIX: &str = "exactly";

/// Minimum percentage gap for a row to be reported.
pub const DEFAULT_MIN_PERCENT_DIFF: f64 = 2.0;

/// Handling of odds that do not parse as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedOddPolicy {
    /// Fail the whole comparison with `CompareError::MalformedOdd`.
    #[default]
    Abort,
    /// Drop the single outcome and log a warning.
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComparisonPolicy {
    /// Market names skipped wholesale (exact match).
    pub excluded_markets: BTreeSet<String>,
    /// Markets with any outcome label starting with this (trimmed,
    /// case-insensitive) are skipped wholesale. Empty disables the check.
    pub excluded_value_prefix: String,
    pub min_percent_diff: f64,
    /// The book that must offer the higher odd for a row to be reported.
    #[serde(rename = "reference_bookmaker")]
    pub reference: BookmakerRole,
    pub on_malformed_odd: MalformedOddPolicy,
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        Self {
            excluded_markets: DEFAULT_EXCLUDED_MARKETS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            excluded_value_prefix: DEFAULT_EXCLUDED_VALUE_PREFIX.to_string(),
            min_percent_diff: DEFAULT_MIN_PERCENT_DIFF,
            reference: BookmakerRole::Bookmaker2,
            on_malformed_odd: MalformedOddPolicy::Abort,
        }
    }
}

impl ComparisonPolicy {
    pub fn is_excluded_market(&self, name: &str) -> bool {
        self.excluded_markets.contains(name)
    }

    /// Whether any outcome of `market` carries the excluded label prefix.
    pub fn has_excluded_value(&self, market: &BetMarket) -> bool {
        let prefix = self.excluded_value_prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return false;
        }
        market
            .values
            .iter()
            .any(|v| v.value.trim().to_lowercase().starts_with(&prefix))
    }

    /// The row filter: the reference book must be strictly better, by at
    /// least `min_percent_diff` percent.
    pub fn reports(&self, better: Better, percent_diff: f64) -> bool {
        better.favours(self.reference) && percent_diff.abs() >= self.min_percent_diff
    }
}
