//! Shared types for ODDSCOPE.
//!
//! The payload types mirror the API-Football `/odds` response closely
//! enough to deserialize it, but keep identifiers and metadata as raw
//! JSON: the upstream API is inconsistent about whether ids are numbers
//! or numeric strings, so normalization happens where ids are compared,
//! never at parse time.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A normalized bookmaker or bet identifier.
///
/// The derived ordering is the one used for report output: every numeric
/// id sorts before every textual one, numeric ids ascend by value and
/// textual ids ascend lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Identifier {
    Numeric(i64),
    Textual(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{n}"),
            Identifier::Textual(s) => write!(f, "{s}"),
        }
    }
}

/// Normalize a raw identifier: integers (and integer-valued strings)
/// become `Numeric`, floats truncate toward zero, anything else keeps
/// its textual form.
pub fn normalize_id(raw: &Value) -> Identifier {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Identifier::Numeric(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                    Identifier::Numeric(f.trunc() as i64)
                }
                _ => Identifier::Textual(n.to_string()),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Identifier::Numeric)
            .unwrap_or_else(|_| Identifier::Textual(s.clone())),
        other => Identifier::Textual(id_text(other)),
    }
}

/// The plain string form of a raw identifier (strings unquoted).
pub fn id_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Upstream payload (API-Football `/odds`)
// ---------------------------------------------------------------------------

/// Raw `/odds?fixture={id}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OddsPayload {
    /// Fixture records. Only the first one is ever used.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub response: Vec<FixtureOdds>,
    /// API-level errors. API-Football reports these with a 200 status,
    /// as `[]` when there are none and as an object otherwise.
    #[serde(default)]
    pub errors: Value,
}

impl OddsPayload {
    /// The fixture record the comparison works on, if any.
    pub fn first_fixture(&self) -> Option<&FixtureOdds> {
        self.response.first()
    }

    /// Whether the upstream API reported errors alongside the data.
    pub fn has_api_errors(&self) -> bool {
        match &self.errors {
            Value::Null => false,
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

/// Odds for one fixture across all bookmakers.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureOdds {
    #[serde(default = "empty_object")]
    pub fixture: Value,
    #[serde(default = "empty_object")]
    pub league: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bookmakers: Vec<BookmakerEntry>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One bookmaker's listing for a fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerEntry {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bets: Vec<BetMarket>,
}

/// A bet market ("Match Winner", "Goals Over/Under", ...).
#[derive(Debug, Clone, Deserialize)]
pub struct BetMarket {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub values: Vec<Outcome>,
}

/// A priced outcome within a market.
#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    /// The label, e.g. `"Home"`, `"Over 2.5"` or `"-1"`.
    #[serde(default, deserialize_with = "label_text")]
    pub value: String,
    /// Decimal odd as sent by the API (usually a string like `"1.85"`).
    #[serde(default)]
    pub odd: Value,
}

impl Outcome {
    /// The odd as a finite float, or `None` if it is not a number.
    pub fn parsed_odd(&self) -> Option<f64> {
        parse_odd(&self.odd)
    }
}

/// Parse a decimal odd sent either as a JSON number or as text.
pub fn parse_odd(raw: &Value) -> Option<f64> {
    let odd = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    odd.is_finite().then_some(odd)
}

/// Sequences the API sometimes sends as `null` instead of `[]`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn label_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Null => String::new(),
        other => id_text(&other),
    })
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Which side of the comparison a bookmaker sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmakerRole {
    Bookmaker1,
    Bookmaker2,
}

impl fmt::Display for BookmakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmakerRole::Bookmaker1 => write!(f, "bookmaker1"),
            BookmakerRole::Bookmaker2 => write!(f, "bookmaker2"),
        }
    }
}

/// Which bookmaker offers the higher odd for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Better {
    Bookmaker1,
    Bookmaker2,
    Equal,
}

impl Better {
    pub fn between(odd1: f64, odd2: f64) -> Self {
        if odd1 > odd2 {
            Better::Bookmaker1
        } else if odd2 > odd1 {
            Better::Bookmaker2
        } else {
            Better::Equal
        }
    }

    /// Whether this result favours the given bookmaker.
    pub fn favours(&self, role: BookmakerRole) -> bool {
        matches!(
            (self, role),
            (Better::Bookmaker1, BookmakerRole::Bookmaker1)
                | (Better::Bookmaker2, BookmakerRole::Bookmaker2)
        )
    }
}

// ---------------------------------------------------------------------------
// Comparison report
// ---------------------------------------------------------------------------

/// One matched outcome that passed the report filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub value: String,
    pub bookmaker1_odd: f64,
    pub bookmaker2_odd: f64,
    /// `odd2 - odd1`, rounded to 3 dp.
    pub difference: f64,
    /// Difference relative to `odd1`, in percent, rounded to 2 dp.
    pub percent_difference: f64,
    pub better: Better,
}

/// The surviving rows of one bet market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketComparison {
    pub bet_id: Identifier,
    pub bet_name: String,
    pub values: Vec<ComparisonRow>,
}

/// Id and display name of a compared bookmaker, as sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmakerSummary {
    pub id: Value,
    pub name: Option<String>,
}

impl From<&BookmakerEntry> for BookmakerSummary {
    fn from(entry: &BookmakerEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
        }
    }
}

/// Full result of comparing two bookmakers on one fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub fixture_id: i64,
    pub fixture: Value,
    pub league: Value,
    pub bookmaker1: BookmakerSummary,
    pub bookmaker2: BookmakerSummary,
    pub comparisons: Vec<MarketComparison>,
}

impl ComparisonResult {
    /// Total number of reported rows across all markets.
    pub fn row_count(&self) -> usize {
        self.comparisons.iter().map(|c| c.values.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a comparison could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("No odds data found for this fixture")]
    NoOddsData { fixture_id: i64 },

    #[error("Bookmaker {bookmaker_id} not found for this fixture")]
    BookmakerNotFound {
        fixture_id: i64,
        bookmaker_id: i64,
        role: BookmakerRole,
    },

    #[error("Malformed odd {raw} for value {value:?} in bet {bet_id} ({role})")]
    MalformedOdd {
        role: BookmakerRole,
        bet_id: Identifier,
        value: String,
        raw: String,
    },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Machine-readable tag of an [`ErrorResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoOddsData,
    BookmakerNotFound,
}

/// Structured error returned to callers in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResult {
    pub error: String,
    pub kind: ErrorKind,
    pub fixture_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmaker_id: Option<i64>,
}

impl CompareError {
    /// The structured form of this error, for the classes that are
    /// answered with a value rather than treated as a failure.
    pub fn error_result(&self) -> Option<ErrorResult> {
        match self {
            CompareError::NoOddsData { fixture_id } => Some(ErrorResult {
                error: self.to_string(),
                kind: ErrorKind::NoOddsData,
                fixture_id: *fixture_id,
                bookmaker_id: None,
            }),
            CompareError::BookmakerNotFound {
                fixture_id,
                bookmaker_id,
                ..
            } => Some(ErrorResult {
                error: self.to_string(),
                kind: ErrorKind::BookmakerNotFound,
                fixture_id: *fixture_id,
                bookmaker_id: Some(*bookmaker_id),
            }),
            CompareError::MalformedOdd { .. } | CompareError::Transport(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
