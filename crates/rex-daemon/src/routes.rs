//! Axum router and HTTP handlers for rex-daemon (spec §6).
//!
//! `build_router` is the single entry point; `main.rs` attaches the CORS,
//! tracing and rate-limit layers after this call so tests can use the bare
//! router.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tracing::info;

use rex_schemas::{Command, CommandKind, StrategyConfig};

use crate::api_types::{
    AccountResponse, AvailableStrategiesResponse, BatchDeleteRequest, BatchDeleteResult,
    DeleteResponse, ErrorResponse, HealthResponse, OpenTradesResponse, StrategySummary,
    TradeHistoryQuery,
};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/account", get(account))
        .route("/api/strategies", get(list_strategies))
        .route("/api/strategies/available", get(available_strategies))
        .route("/api/strategies/start", post(start_strategy))
        .route("/api/strategies/:id/stop", post(stop_strategy))
        .route("/api/strategies/:id/permanent", delete(delete_permanent))
        .route("/api/strategies/batch", delete(delete_batch))
        .route("/api/trades/open", get(open_trades))
        .route("/api/trades/history", get(trade_history))
        .with_state(state)
}

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_sec: st.executor.uptime_secs(),
        broker_connected: st.executor.broker_connected(),
        platform_connected: st.executor.platform_connected(),
        active_runtimes: st.executor.active_runtime_count().await,
    })
}

async fn account(State(st): State<Arc<AppState>>) -> Response {
    match st.executor.account_info().await {
        Ok(info) => {
            let body: AccountResponse = info;
            Json(body).into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn list_strategies(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let summaries: Vec<StrategySummary> = st
        .executor
        .list_strategies()
        .await
        .into_iter()
        .map(StrategySummary::from)
        .collect();
    Json(summaries)
}

async fn available_strategies(State(st): State<Arc<AppState>>) -> Response {
    match st.executor.available_strategies().await {
        Ok(configs) => {
            let body: AvailableStrategiesResponse = configs;
            Json(body).into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

async fn start_strategy(State(st): State<Arc<AppState>>, Json(config): Json<StrategyConfig>) -> Response {
    match st.executor.start_strategy(config).await {
        Ok(snapshot) => (StatusCode::CREATED, Json(StrategySummary::from(snapshot))).into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

async fn stop_strategy(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let command = Command {
        id: uuid::Uuid::new_v4(),
        kind: CommandKind::Stop,
        payload: serde_json::json!({ "strategyId": id }),
        created_at: chrono::Utc::now(),
        expires_at: None,
    };
    match st.executor.dispatch(&id, command).await {
        Ok(()) => {
            info!(strategy_id = %id, "stop requested");
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => not_found_or_bad_request(e),
    }
}

async fn delete_permanent(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match st.executor.delete_permanent(&id).await {
        Ok(outcome) => Json(DeleteResponse::from(outcome)).into_response(),
        Err(e) => internal_error(e.into()),
    }
}

async fn delete_batch(
    State(st): State<Arc<AppState>>,
    Json(BatchDeleteRequest(ids)): Json<BatchDeleteRequest>,
) -> Response {
    let results = st.executor.delete_batch(&ids).await;
    let body: Vec<BatchDeleteResult> = results
        .into_iter()
        .map(|(id, outcome)| match outcome {
            Ok(o) => BatchDeleteResult {
                id,
                outcome: Some(DeleteResponse::from(o)),
                error: None,
            },
            Err(e) => BatchDeleteResult {
                id,
                outcome: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    Json(body).into_response()
}

async fn open_trades(State(st): State<Arc<AppState>>) -> Response {
    match st.executor.open_positions().await {
        Ok(positions) => {
            let body: OpenTradesResponse = positions;
            Json(body).into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn trade_history(State(st): State<Arc<AppState>>, Query(q): Query<TradeHistoryQuery>) -> Response {
    match st.executor.trade_history(q.strategy_id.as_deref()).await {
        Ok(rows) => Json(rows.into_iter().map(TradeLogJson::from).collect::<Vec<_>>()).into_response(),
        Err(e) => internal_error(e.into()),
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeLogJson {
    id: String,
    strategy_id: String,
    event_kind: String,
    payload: serde_json::Value,
    time: chrono::DateTime<chrono::Utc>,
}

impl From<rex_db::TradeLogRow> for TradeLogJson {
    fn from(row: rex_db::TradeLogRow) -> Self {
        Self {
            id: row.id,
            strategy_id: row.strategy_id,
            event_kind: row.event_kind,
            payload: row.payload_json,
            time: row.time,
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

fn internal_error(e: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: e.to_string() }),
    )
        .into_response()
}

fn not_found_or_bad_request(e: rex_runtime::ExecutorError) -> Response {
    let status = match e {
        rex_runtime::ExecutorError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}
