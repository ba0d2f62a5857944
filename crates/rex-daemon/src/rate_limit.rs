//! Per-peer HTTP rate limiting (spec §6, §8 S4): 100 requests per 60 s per
//! peer IP; the 101st within the window gets `429` with
//! `X-RateLimit-Remaining: 0`. Skipped entirely outside production mode.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

pub type PeerLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// `requests_per_window` within `window`, e.g. `(100, 60s)`.
pub fn new_limiter(requests_per_window: u32, window: Duration) -> Arc<PeerLimiter> {
    let period = window / requests_per_window;
    let quota = Quota::with_period(period)
        .expect("window/requests_per_window must be non-zero")
        .allow_burst(NonZeroU32::new(requests_per_window).expect("requests_per_window must be non-zero"));
    Arc::new(RateLimiter::keyed(quota))
}

pub async fn enforce(
    State(limiter): State<Arc<PeerLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    match limiter.check_key(&addr.ip()) {
        Ok(_) => next.run(req).await,
        Err(_) => {
            let mut res = StatusCode::TOO_MANY_REQUESTS.into_response();
            res.headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            res
        }
    }
}
