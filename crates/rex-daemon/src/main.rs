//! rex-daemon entry point.
//!
//! Thin by design: loads config, wires the broker/platform/db, boots
//! `ExecutorCore`, and starts the HTTP server. All route handlers live in
//! `routes.rs`; all shared state lives in `state.rs`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use rex_daemon::{rate_limit, routes, state};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config_paths = std::env::var("REX_CONFIG_PATHS").unwrap_or_else(|_| "config/base.yaml".to_string());
    let paths: Vec<&str> = config_paths.split(',').collect();
    let loaded = rex_config::load_layered_yaml(&paths).context("loading rex-daemon config")?;
    let config = rex_config::resolve_executor_config(&loaded.config_json).context("resolving executor config")?;
    info!(config_hash = %loaded.config_hash, env = %config.env, "config loaded");

    let db = rex_db::connect_from_env().await.context("connecting to db")?;
    rex_db::migrate(&db).await.context("running migrations")?;

    let broker: Arc<dyn rex_broker::BrokerClient> = match &config.broker_terminal_path {
        Some(base_url) => Arc::new(rex_broker::TerminalBroker::new(base_url.clone())?),
        None => Arc::new(rex_broker::PaperBroker::new(rex_broker::AccountInfo {
            balance: 10_000.0,
            equity: 10_000.0,
            margin: 0.0,
            free_margin: 10_000.0,
            currency: "USD".to_string(),
        })),
    };

    let platform: Arc<dyn rex_platform::PlatformLink> = Arc::new(rex_platform::RestPlatformLink::new(
        config.platform_base_url.clone(),
        config.api_key.clone(),
    ));

    let executor = Arc::new(rex_runtime::ExecutorCore::new(
        config.executor_id.clone(),
        broker,
        platform,
        db,
    ));
    executor.boot().await.context("reconstructing persisted strategies")?;

    tokio::spawn(executor.clone().run_heartbeat(Duration::from_secs(5)));
    tokio::spawn(executor.clone().run_command_ingestion());

    let shared = Arc::new(state::AppState::new(executor));

    let mut app = routes::build_router(Arc::clone(&shared)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    if config.env == "prod" {
        let limiter = rate_limit::new_limiter(100, Duration::from_secs(60));
        app = app.layer(axum::middleware::from_fn_with_state(limiter, rate_limit::enforce));
    }

    app = app.layer(cors_layer(&config.platform_base_url, config.debug));

    let addr = SocketAddr::new(config.http_host.parse().context("invalid httpHost")?, config.http_port);
    info!("rex-daemon listening on http://{addr}");

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// CORS restricted to the platform's origin plus localhost in debug (spec §6).
fn cors_layer(platform_base_url: &str, debug: bool) -> CorsLayer {
    let mut origins = Vec::new();
    if let Ok(v) = HeaderValue::from_str(platform_base_url) {
        origins.push(v);
    }
    if debug {
        for o in [
            "http://localhost:3000",
            "http://127.0.0.1:3000",
            "http://localhost:5173",
            "http://127.0.0.1:5173",
        ] {
            if let Ok(v) = HeaderValue::from_str(o) {
                origins.push(v);
            }
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
