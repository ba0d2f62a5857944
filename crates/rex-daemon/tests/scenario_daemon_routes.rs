//! In-process scenario tests for rex-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot` — no network I/O required.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rex_daemon::{rate_limit, routes, state};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn test_executor(db_name: &str) -> Arc<rex_runtime::ExecutorCore> {
    let db = rex_db::connect(&format!("file:{db_name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    rex_db::migrate(&db).await.expect("migrate");

    let broker: Arc<dyn rex_broker::BrokerClient> = Arc::new(rex_broker::PaperBroker::new(rex_broker::AccountInfo {
        balance: 10_000.0,
        equity: 10_000.0,
        margin: 0.0,
        free_margin: 10_000.0,
        currency: "USD".to_string(),
    }));
    let platform: Arc<dyn rex_platform::PlatformLink> = Arc::new(rex_platform::InMemoryPlatformLink::new());

    Arc::new(rex_runtime::ExecutorCore::new("exec-test", broker, platform, db))
}

async fn make_router(db_name: &str) -> axum::Router {
    let executor = test_executor(db_name).await;
    let st = Arc::new(state::AppState::new(executor));
    routes::build_router(st)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder().method("GET").uri(uri).body(axum::body::Body::empty()).unwrap()
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_and_zero_runtimes_on_fresh_state() {
    let router = make_router("routes_health").await;
    let (status, body) = call(router, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["activeRuntimes"], 0);
    assert_eq!(json["brokerConnected"], true);
}

// ---------------------------------------------------------------------------
// GET /api/account
// ---------------------------------------------------------------------------

#[tokio::test]
async fn account_returns_paper_broker_balance() {
    let router = make_router("routes_account").await;
    let (status, body) = call(router, get("/api/account")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["balance"], 10_000.0);
    assert_eq!(json["currency"], "USD");
}

// ---------------------------------------------------------------------------
// GET /api/strategies and /api/trades/open on fresh state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_strategies_is_empty_on_fresh_state() {
    let router = make_router("routes_list_empty").await;
    let (status, body) = call(router, get("/api/strategies")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), serde_json::json!([]));
}

#[tokio::test]
async fn open_trades_is_empty_on_fresh_state() {
    let router = make_router("routes_open_trades").await;
    let (status, body) = call(router, get("/api/trades/open")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// DELETE on an unknown strategy id returns a handled error, not a panic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_unknown_strategy_returns_not_found() {
    let router = make_router("routes_stop_unknown").await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/strategies/does-not-exist/stop")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = call(router, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Unknown routes return 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let router = make_router("routes_unknown").await;
    let (status, _) = call(router, get("/api/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// S4: per-peer rate limiting — 110 requests from one peer in a tight loop,
// expect exactly 100 to succeed and 10 to be rejected with 429 plus a
// `X-RateLimit-Remaining: 0` header (spec §6, §8 S4).
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limiter_admits_exactly_the_configured_burst_then_rejects() {
    let executor = test_executor("routes_rate_limit").await;
    let st = Arc::new(state::AppState::new(executor));

    let limiter = rate_limit::new_limiter(100, Duration::from_secs(60));
    let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 4242);

    let app = routes::build_router(st)
        .layer(axum::middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(MockConnectInfo(peer));

    let mut ok_count = 0u32;
    let mut rejected_count = 0u32;
    let mut last_rejected_header = None;

    for _ in 0..110 {
        let resp = app.clone().oneshot(get("/api/health")).await.expect("oneshot");
        match resp.status() {
            StatusCode::OK => ok_count += 1,
            StatusCode::TOO_MANY_REQUESTS => {
                rejected_count += 1;
                last_rejected_header = resp.headers().get("X-RateLimit-Remaining").cloned();
            }
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok_count, 100, "exactly the configured burst should be admitted");
    assert_eq!(rejected_count, 10, "the remaining 10 requests should be rejected");
    assert_eq!(last_rejected_header.expect("at least one rejection"), "0");
}

// ---------------------------------------------------------------------------
// A different peer is rate-limited independently of the first.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limiter_is_keyed_per_peer() {
    let executor = test_executor("routes_rate_limit_per_peer").await;
    let st = Arc::new(state::AppState::new(executor));

    let limiter = rate_limit::new_limiter(1, Duration::from_secs(60));

    let peer_a = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 1);
    let app_a = routes::build_router(Arc::clone(&st))
        .layer(axum::middleware::from_fn_with_state(Arc::clone(&limiter), rate_limit::enforce))
        .layer(MockConnectInfo(peer_a));

    let peer_b = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 1);
    let app_b = routes::build_router(Arc::clone(&st))
        .layer(axum::middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(MockConnectInfo(peer_b));

    let (status_a1, _) = call(app_a.clone(), get("/api/health")).await;
    assert_eq!(status_a1, StatusCode::OK);
    let (status_a2, _) = call(app_a, get("/api/health")).await;
    assert_eq!(status_a2, StatusCode::TOO_MANY_REQUESTS);

    let (status_b1, _) = call(app_b, get("/api/health")).await;
    assert_eq!(status_b1, StatusCode::OK, "a fresh peer should not be blocked by another peer's usage");
}
