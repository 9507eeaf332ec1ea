//! End-to-end comparison through the Axum router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use oddscope::comparison::{ComparisonPolicy, MalformedOddPolicy};
use oddscope::data::api_football::ApiFootballClient;
use oddscope::data::{FixtureQuery, OddsSource};
use oddscope::server::{build_router, ServerState};
use oddscope::types::BookmakerRole;

use crate::mock_source::{derby_odds, StaticOddsSource};

const DERBY: i64 = 1035037;

fn router(source: Arc<StaticOddsSource>, policy: ComparisonPolicy) -> Router {
    let source: Arc<dyn OddsSource> = source;
    build_router(Arc::new(ServerState::new(Some(source), policy)))
}

fn derby_source() -> Arc<StaticOddsSource> {
    Arc::new(StaticOddsSource::new().with_fixture(DERBY, derby_odds()))
}

fn compare_request(fixture_id: i64, bookmaker1_id: i64, bookmaker2_id: i64) -> Request<Body> {
    let body = json!({
        "fixture_id": fixture_id,
        "bookmaker1_id": bookmaker1_id,
        "bookmaker2_id": bookmaker2_id,
    });
    Request::builder()
        .method("POST")
        .uri("/api/compare")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(resp: Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn bet_ids(result: &Value) -> Vec<Value> {
    result["comparisons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["bet_id"].clone())
        .collect()
}

fn labels(market: &Value) -> Vec<&str> {
    market["values"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["value"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_derby_comparison_default_policy() {
    let source = derby_source();
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let resp = app.oneshot(compare_request(DERBY, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(source.odds_calls(), 1);

    let result = json_body(resp).await;
    assert_eq!(result["fixture_id"], DERBY);
    assert_eq!(result["league"]["name"], "Premier League");
    assert_eq!(result["bookmaker1"], json!({"id": 6, "name": "Bwin"}));
    assert_eq!(result["bookmaker2"], json!({"id": "8", "name": "Bet365"}));

    // Exact Score is excluded by name, Total Corners by its "exactly" line.
    // Numeric ids sort before textual ones; "4" and 4 are the same market.
    assert_eq!(bet_ids(&result), vec![json!(1), json!(4), json!(5), json!("special")]);

    let comparisons = &result["comparisons"];
    assert_eq!(labels(&comparisons[0]), vec!["Home"]);
    assert_eq!(labels(&comparisons[1]), vec!["Home -1"]);
    assert_eq!(labels(&comparisons[2]), vec!["Over 1.5", "Over 2.5"]);
    assert_eq!(labels(&comparisons[3]), vec!["Anytime"]);

    let home = &comparisons[0]["values"][0];
    assert_eq!(home["bookmaker1_odd"], 2.4);
    assert_eq!(home["bookmaker2_odd"], 2.5);
    assert_eq!(home["better"], "bookmaker2");
    assert!((home["difference"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    assert!((home["percent_difference"].as_f64().unwrap() - 4.17).abs() < 1e-9);

    let handicap = &comparisons[1]["values"][0];
    assert!((handicap["percent_difference"].as_f64().unwrap() - 9.68).abs() < 1e-9);
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let source = derby_source();
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let first = json_body(app.clone().oneshot(compare_request(DERBY, 6, 8)).await.unwrap()).await;
    let second = json_body(app.oneshot(compare_request(DERBY, 6, 8)).await.unwrap()).await;

    assert_eq!(first, second);
    assert_eq!(source.odds_calls(), 2);
}

#[tokio::test]
async fn test_higher_threshold_drops_small_gaps() {
    let policy = ComparisonPolicy {
        min_percent_diff: 5.0,
        ..ComparisonPolicy::default()
    };
    let app = router(derby_source(), policy);

    let result = json_body(app.oneshot(compare_request(DERBY, 6, 8)).await.unwrap()).await;
    assert_eq!(bet_ids(&result), vec![json!(4), json!(5), json!("special")]);
    assert_eq!(labels(&result["comparisons"][1]), vec!["Over 2.5"]);
}

#[tokio::test]
async fn test_reference_bookmaker1_reports_other_side() {
    let policy = ComparisonPolicy {
        reference: BookmakerRole::Bookmaker1,
        ..ComparisonPolicy::default()
    };
    let app = router(derby_source(), policy);

    let result = json_body(app.oneshot(compare_request(DERBY, 6, 8)).await.unwrap()).await;
    // Only Away (3.00 vs 2.90) favours Bwin.
    assert_eq!(bet_ids(&result), vec![json!(1)]);

    let away = &result["comparisons"][0]["values"][0];
    assert_eq!(away["value"], "Away");
    assert_eq!(away["better"], "bookmaker1");
    assert!((away["difference"].as_f64().unwrap() + 0.1).abs() < 1e-9);
    assert!((away["percent_difference"].as_f64().unwrap() + 3.33).abs() < 1e-9);
}

#[tokio::test]
async fn test_swapped_bookmakers() {
    let app = router(derby_source(), ComparisonPolicy::default());

    let result = json_body(app.oneshot(compare_request(DERBY, 8, 6)).await.unwrap()).await;
    assert_eq!(result["bookmaker1"]["name"], "Bet365");
    assert_eq!(bet_ids(&result), vec![json!(1)]);
    assert_eq!(labels(&result["comparisons"][0]), vec!["Away"]);
}

#[tokio::test]
async fn test_unknown_fixture_is_404() {
    let source = derby_source();
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let resp = app.oneshot(compare_request(1, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(source.odds_calls(), 1);

    let body = json_body(resp).await;
    assert_eq!(body["error"], "No odds data found for this fixture");
    assert_eq!(body["kind"], "no_odds_data");
    assert_eq!(body["fixture_id"], 1);
}

#[tokio::test]
async fn test_unknown_bookmaker_is_404() {
    let app = router(derby_source(), ComparisonPolicy::default());

    let resp = app.oneshot(compare_request(DERBY, 6, 11)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = json_body(resp).await;
    assert_eq!(body["error"], "Bookmaker 11 not found for this fixture");
    assert_eq!(body["kind"], "bookmaker_not_found");
    assert_eq!(body["bookmaker_id"], 11);
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let source = derby_source();
    source.set_error("Error fetching odds: connection reset");
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let resp = app.oneshot(compare_request(DERBY, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_bad_request_never_reaches_source() {
    let source = derby_source();
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let req = Request::builder()
        .method("POST")
        .uri("/api/compare")
        .header("content-type", "application/json")
        .body(Body::from(json!({"fixture_id": DERBY}).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(source.odds_calls(), 0);
}

fn malformed_odds() -> Value {
    json!({
        "response": [{
            "bookmakers": [
                {"id": 6, "name": "Bwin", "bets": [
                    {"id": 1, "name": "Match Winner", "values": [
                        {"value": "Home", "odd": "2.40"},
                        {"value": "Away", "odd": "N/A"}
                    ]}
                ]},
                {"id": 8, "name": "Bet365", "bets": [
                    {"id": 1, "name": "Match Winner", "values": [
                        {"value": "Home", "odd": "2.60"},
                        {"value": "Away", "odd": "3.50"}
                    ]}
                ]}
            ]
        }]
    })
}

#[tokio::test]
async fn test_malformed_odd_aborts_by_default() {
    let source = Arc::new(StaticOddsSource::new().with_fixture(7, malformed_odds()));
    let app = router(source, ComparisonPolicy::default());

    let resp = app.oneshot(compare_request(7, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("N/A"));
}

#[tokio::test]
async fn test_malformed_odd_skipped_when_configured() {
    let source = Arc::new(StaticOddsSource::new().with_fixture(7, malformed_odds()));
    let policy = ComparisonPolicy {
        on_malformed_odd: MalformedOddPolicy::Skip,
        ..ComparisonPolicy::default()
    };
    let app = router(source, policy);

    let resp = app.oneshot(compare_request(7, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let result = json_body(resp).await;
    assert_eq!(labels(&result["comparisons"][0]), vec!["Home"]);
}

#[tokio::test]
async fn test_bookmakers_listing() {
    let app = router(derby_source(), ComparisonPolicy::default());

    let resp = app.oneshot(get_request("/api/bookmakers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["response"][1]["name"], "Bet365");
}

#[tokio::test]
async fn test_fixtures_query_forwarded() {
    let source = derby_source();
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let resp = app
        .oneshot(get_request("/api/fixtures?league=39&season=2024&date="))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        source.last_query(),
        Some(FixtureQuery {
            date: None,
            league: Some(39),
            season: Some(2024),
        })
    );

    let body = json_body(resp).await;
    assert_eq!(body["response"][0]["fixture"]["id"], DERBY);
}

#[tokio::test]
async fn test_fixtures_invalid_params() {
    let source = derby_source();
    let app = router(Arc::clone(&source), ComparisonPolicy::default());

    let resp = app
        .clone()
        .oneshot(get_request("/api/fixtures?league=premier"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Invalid league ID or season");

    let resp = app.oneshot(get_request("/api/fixtures?date=tomorrow")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(source.last_query(), None);
}

#[tokio::test]
async fn test_without_api_key_routes_answer_500() {
    let app = build_router(Arc::new(ServerState::new(None, ComparisonPolicy::default())));

    let resp = app.clone().oneshot(compare_request(DERBY, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("API_FOOTBALL_KEY"));

    let resp = app.clone().oneshot(get_request("/api/bookmakers")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_live_client_against_local_upstream() {
    let upstream = Router::new().route("/odds", get(|| async { Json(derby_odds()) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let client: Arc<dyn OddsSource> = Arc::new(
        ApiFootballClient::new(
            SecretString::new("test-key".to_string()),
            Some(format!("http://{addr}")),
            Duration::from_secs(5),
        )
        .unwrap(),
    );
    let app = build_router(Arc::new(ServerState::new(
        Some(client),
        ComparisonPolicy::default(),
    )));

    let resp = app.oneshot(compare_request(DERBY, 6, 8)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let result = json_body(resp).await;
    assert_eq!(bet_ids(&result), vec![json!(1), json!(4), json!(5), json!("special")]);
}
