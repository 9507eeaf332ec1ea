//! HTTP route handlers.
//!
//! All API endpoints return JSON. State is shared via `Arc<ServerState>`.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::comparison::{ComparisonPolicy, OddsComparator};
use crate::data::{FixtureQuery, OddsSource};
use crate::types::CompareError;

const DEFAULT_API_KEY_ENV: &str = "API_FOOTBALL_KEY";
const MISSING_PARAMS: &str =
    "Missing required parameters: fixture_id, bookmaker1_id, bookmaker2_id";
const INVALID_PARAMS: &str = "Invalid parameter types. All IDs must be integers";

static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
///
/// Both fields are `None` when no API key is configured; the API routes
/// then answer 500 instead of the server refusing to start.
pub struct ServerState {
    pub source: Option<Arc<dyn OddsSource>>,
    pub comparator: Option<OddsComparator>,
    /// Env var named in the "not initialized" error.
    pub api_key_env: String,
}

impl ServerState {
    pub fn new(source: Option<Arc<dyn OddsSource>>, policy: ComparisonPolicy) -> Self {
        let comparator = source
            .as_ref()
            .map(|s| OddsComparator::new(Arc::clone(s), policy));
        Self {
            source,
            comparator,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }

    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = name.into();
        self
    }

    fn not_initialized(&self) -> Response {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "API client not initialized. Please set {} environment variable",
                self.api_key_env
            ),
        )
    }
}

pub type AppState = Arc<ServerState>;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareRequest {
    pub fixture_id: i64,
    pub bookmaker1_id: i64,
    pub bookmaker2_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    Missing,
    Invalid,
}

impl RequestError {
    fn message(&self) -> &'static str {
        match self {
            RequestError::Missing => MISSING_PARAMS,
            RequestError::Invalid => INVALID_PARAMS,
        }
    }
}

impl CompareRequest {
    const FIELDS: [&'static str; 3] = ["fixture_id", "bookmaker1_id", "bookmaker2_id"];

    /// Parse the JSON body. Absent, null, zero and empty values count as
    /// missing; ids may be integers or integer strings.
    pub fn from_json(body: &Value) -> Result<Self, RequestError> {
        let fields = Self::FIELDS.map(|name| body.get(name).unwrap_or(&NULL));

        if fields.iter().any(|v| is_blank(v)) {
            return Err(RequestError::Missing);
        }

        let [fixture_id, bookmaker1_id, bookmaker2_id] = fields;
        Ok(Self {
            fixture_id: parse_id(fixture_id)?,
            bookmaker1_id: parse_id(bookmaker1_id)?,
            bookmaker2_id: parse_id(bookmaker2_id)?,
        })
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn parse_id(v: &Value) -> Result<i64, RequestError> {
    match v {
        Value::Number(n) => n.as_i64().ok_or(RequestError::Invalid),
        Value::String(s) => s.trim().parse().map_err(|_| RequestError::Invalid),
        _ => Err(RequestError::Invalid),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FixturesParams {
    pub date: Option<String>,
    pub league: Option<String>,
    pub season: Option<String>,
}

impl FixturesParams {
    /// Validate into an upstream query. Empty strings count as unset.
    pub fn into_query(self) -> Result<FixtureQuery, &'static str> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let date = match non_empty(self.date) {
            Some(d) => {
                NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                    .map_err(|_| "Invalid date. Expected format YYYY-MM-DD")?;
                Some(d.trim().to_string())
            }
            None => None,
        };
        let league = non_empty(self.league)
            .map(|l| l.trim().parse::<i64>())
            .transpose()
            .map_err(|_| "Invalid league ID or season")?;
        let season = non_empty(self.season)
            .map(|s| s.trim().parse::<i32>())
            .transpose()
            .map_err(|_| "Invalid league ID or season")?;

        Ok(FixtureQuery { date, league, season })
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/compare
pub async fn compare(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Some(comparator) = &state.comparator else {
        return state.not_initialized();
    };

    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected compare request body");
            return error_response(StatusCode::BAD_REQUEST, MISSING_PARAMS);
        }
    };

    let request = match CompareRequest::from_json(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(?body, error = e.message(), "Rejected compare request");
            return error_response(StatusCode::BAD_REQUEST, e.message());
        }
    };

    let request_id = Uuid::new_v4();
    info!(
        %request_id,
        fixture_id = request.fixture_id,
        bookmaker1_id = request.bookmaker1_id,
        bookmaker2_id = request.bookmaker2_id,
        "Compare request"
    );

    match comparator
        .compare_odds(request.fixture_id, request.bookmaker1_id, request.bookmaker2_id)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            if let Some(body) = err.error_result() {
                info!(%request_id, error = %err, "No comparison available");
                return (StatusCode::NOT_FOUND, Json(body)).into_response();
            }
            let status = match err {
                CompareError::MalformedOdd { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!(%request_id, error = %format!("{err:#}"), "Comparison failed");
            error_response(status, format!("{err:#}"))
        }
    }
}

/// GET /api/bookmakers
pub async fn bookmakers(State(state): State<AppState>) -> Response {
    let Some(source) = &state.source else {
        return state.not_initialized();
    };

    match source.fetch_bookmakers().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Bookmakers lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

/// GET /api/fixtures?date=&league=&season=
pub async fn fixtures(
    State(state): State<AppState>,
    Query(params): Query<FixturesParams>,
) -> Response {
    let Some(source) = &state.source else {
        return state.not_initialized();
    };

    let query = match params.into_query() {
        Ok(q) => q,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match source.fetch_fixtures(&query).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(error = %format!("{e:#}"), ?query, "Fixtures lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
