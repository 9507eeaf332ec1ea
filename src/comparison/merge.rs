//! Market merge.
//!
//! Matches the bet markets of two bookmakers by normalized id, then the
//! outcomes inside each matched market by label, and keeps the rows the
//! policy considers worth reporting.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use super::policy::{ComparisonPolicy, MalformedOddPolicy};
use crate::types::{
    id_text, normalize_id, BetMarket, Better, BookmakerEntry, BookmakerRole, CompareError,
    ComparisonRow, Identifier, MarketComparison,
};

/// Build the per-market comparison between two bookmakers.
///
/// Markets come out ordered by id (numeric ids first), rows by label
/// (numeric labels first). Markets with no reportable rows are omitted.
pub fn merge_markets(
    bookmaker1: &BookmakerEntry,
    bookmaker2: &BookmakerEntry,
    policy: &ComparisonPolicy,
) -> Result<Vec<MarketComparison>, CompareError> {
    let markets1 = index_markets(bookmaker1);
    let markets2 = index_markets(bookmaker2);

    // Walk the union so one-sided markets are visible here, then skip them.
    let all_ids: BTreeSet<&Identifier> = markets1.keys().chain(markets2.keys()).collect();

    let mut comparisons = Vec::new();
    for bet_id in all_ids {
        let (Some(bet1), Some(bet2)) = (markets1.get(bet_id), markets2.get(bet_id)) else {
            continue;
        };

        let bet_name = display_name(bet_id, bet1, bet2);
        if policy.is_excluded_market(&bet_name) {
            debug!(%bet_id, bet_name = %bet_name, "Skipping excluded market");
            continue;
        }
        if policy.has_excluded_value(bet1) || policy.has_excluded_value(bet2) {
            debug!(%bet_id, bet_name = %bet_name, "Skipping market with three-way lines");
            continue;
        }

        let odds1 = index_odds(bet1, bet_id, BookmakerRole::Bookmaker1, policy)?;
        let odds2 = index_odds(bet2, bet_id, BookmakerRole::Bookmaker2, policy)?;

        let labels: Vec<&str> = odds1
            .keys()
            .chain(odds2.keys())
            .copied()
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .collect();

        let rows: Vec<ComparisonRow> = sort_labels(labels)
            .into_iter()
            .filter_map(|label| {
                let odd1 = *odds1.get(label)?;
                let odd2 = *odds2.get(label)?;
                compare_outcome(label, odd1, odd2, policy)
            })
            .collect();

        if rows.is_empty() {
            continue;
        }
        comparisons.push(MarketComparison {
            bet_id: bet_id.clone(),
            bet_name,
            values: rows,
        });
    }

    Ok(comparisons)
}

/// Markets keyed by normalized id. A repeated id keeps the last market.
fn index_markets(entry: &BookmakerEntry) -> BTreeMap<Identifier, &BetMarket> {
    entry
        .bets
        .iter()
        .map(|bet| (normalize_id(&bet.id), bet))
        .collect()
}

fn display_name(bet_id: &Identifier, bet1: &BetMarket, bet2: &BetMarket) -> String {
    bet1.name
        .clone()
        .or_else(|| bet2.name.clone())
        .unwrap_or_else(|| format!("Bet {bet_id}"))
}

/// Outcome odds keyed by label. A repeated label keeps the last odd.
fn index_odds<'a>(
    market: &'a BetMarket,
    bet_id: &Identifier,
    role: BookmakerRole,
    policy: &ComparisonPolicy,
) -> Result<HashMap<&'a str, f64>, CompareError> {
    let mut odds = HashMap::with_capacity(market.values.len());
    for outcome in &market.values {
        match outcome.parsed_odd() {
            Some(odd) => {
                odds.insert(outcome.value.as_str(), odd);
            }
            None => match policy.on_malformed_odd {
                MalformedOddPolicy::Abort => {
                    return Err(CompareError::MalformedOdd {
                        role,
                        bet_id: bet_id.clone(),
                        value: outcome.value.clone(),
                        raw: id_text(&outcome.odd),
                    });
                }
                MalformedOddPolicy::Skip => {
                    warn!(
                        %role,
                        %bet_id,
                        value = %outcome.value,
                        raw = %outcome.odd,
                        "Dropping outcome with malformed odd"
                    );
                }
            },
        }
    }
    Ok(odds)
}

fn compare_outcome(
    label: &str,
    odd1: f64,
    odd2: f64,
    policy: &ComparisonPolicy,
) -> Option<ComparisonRow> {
    let diff = odd2 - odd1;
    let percent_diff = if odd1 > 0.0 {
        (diff / odd1) * 100.0
    } else {
        0.0
    };
    let better = Better::between(odd1, odd2);

    if !policy.reports(better, percent_diff) {
        return None;
    }

    Some(ComparisonRow {
        value: label.to_string(),
        bookmaker1_odd: odd1,
        bookmaker2_odd: odd2,
        difference: round_dp(diff, 3),
        percent_difference: round_dp(percent_diff, 2),
        better,
    })
}

/// Round half-to-even on the exact binary value of `x`.
fn round_dp(x: f64, dp: u32) -> f64 {
    Decimal::from_f64_retain(x)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(x)
}

// ---------------------------------------------------------------------------
// Label ordering
// ---------------------------------------------------------------------------

/// Sort key for an outcome label: handicap lines like `"-1"` or `"+1.5"`
/// are numeric, everything else is textual.
#[derive(Debug, Clone, Copy)]
enum LabelKey<'a> {
    Numeric(f64, &'a str),
    Textual(&'a str),
}

impl<'a> LabelKey<'a> {
    fn parse(label: &'a str) -> Self {
        match label.trim().parse::<f64>() {
            Ok(v) => LabelKey::Numeric(v, label),
            Err(_) => LabelKey::Textual(label),
        }
    }

    fn is_orderable(&self) -> bool {
        !matches!(self, LabelKey::Numeric(v, _) if v.is_nan())
    }

    fn label(&self) -> &'a str {
        match *self {
            LabelKey::Numeric(_, l) | LabelKey::Textual(l) => l,
        }
    }
}

impl Ord for LabelKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (LabelKey::Numeric(a, la), LabelKey::Numeric(b, lb)) => {
                a.total_cmp(b).then_with(|| la.cmp(lb))
            }
            (LabelKey::Numeric(..), LabelKey::Textual(_)) => Ordering::Less,
            (LabelKey::Textual(_), LabelKey::Numeric(..)) => Ordering::Greater,
            (LabelKey::Textual(a), LabelKey::Textual(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for LabelKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for LabelKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LabelKey<'_> {}

/// Numeric labels first (ascending), then textual ones. If any label
/// parses to a value with no order (NaN), the whole set falls back to
/// plain lexicographic order.
fn sort_labels(mut labels: Vec<&str>) -> Vec<&str> {
    let mut keys: Vec<LabelKey> = labels.iter().map(|&l| LabelKey::parse(l)).collect();

    if keys.iter().all(LabelKey::is_orderable) {
        keys.sort();
        keys.into_iter().map(|k| k.label()).collect()
    } else {
        labels.sort_unstable();
        labels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
