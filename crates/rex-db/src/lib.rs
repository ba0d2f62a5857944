//! rex-db — local embedded persistence (spec §6).
//!
//! Sqlite, not the teacher's Postgres: this executor runs on a trader's
//! workstation co-located with the broker terminal, not against a shared
//! server, so a file-backed embedded DB is the right target. See
//! DESIGN.md.

mod audit;

pub use audit::{verify_hash_chain_str, AuditChain, NewTradeLogEvent, VerifyResult};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub const ENV_DB_URL: &str = "REX_DATABASE_URL";

/// Connects to the local sqlite file named by `REX_DATABASE_URL`, creating
/// it if absent, and enables foreign-key enforcement (required for the
/// `trade_logs` cascade-delete on strategy removal).
pub async fn connect_from_env() -> Result<SqlitePool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid sqlite url: {url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .context("failed to connect to sqlite")?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StrategyRow {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub timeframe: String,
    pub payload_json: Value,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_strategy(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    symbol: &str,
    timeframe: &str,
    payload_json: &Value,
) -> Result<()> {
    let payload = serde_json::to_string(payload_json).context("serialize strategy payload")?;
    sqlx::query(
        "insert into strategies (id, name, symbol, timeframe, payload_json, created_at) values (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(symbol)
    .bind(timeframe)
    .bind(payload)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .context("insert_strategy failed")?;
    Ok(())
}

pub async fn list_strategies(pool: &SqlitePool) -> Result<Vec<StrategyRow>> {
    let rows = sqlx::query(
        "select id, name, symbol, timeframe, payload_json, created_at from strategies order by created_at asc",
    )
    .fetch_all(pool)
    .await
    .context("list_strategies failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let payload_str: String = row.try_get("payload_json")?;
        let created_at: String = row.try_get("created_at")?;
        out.push(StrategyRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            symbol: row.try_get("symbol")?,
            timeframe: row.try_get("timeframe")?,
            payload_json: serde_json::from_str(&payload_str).context("parse strategy payload")?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .context("parse created_at")?
                .with_timezone(&Utc),
        });
    }
    Ok(out)
}

/// Deletes the strategy and all its trade logs (FK cascade). Returns
/// `(strategy_deleted, trade_logs_deleted)` for the `DELETE .../permanent`
/// response (spec §6).
pub async fn delete_strategy_permanent(pool: &SqlitePool, id: &str) -> Result<(bool, u64)> {
    let trade_logs_deleted = sqlx::query("delete from trade_logs where strategy_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("delete trade_logs failed")?
        .rows_affected();

    let strategy_deleted = sqlx::query("delete from strategies where id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("delete strategy failed")?
        .rows_affected()
        > 0;

    Ok((strategy_deleted, trade_logs_deleted))
}

#[derive(Debug, Clone)]
pub struct TradeLogRow {
    pub id: String,
    pub strategy_id: String,
    pub event_kind: String,
    pub payload_json: Value,
    pub time: DateTime<Utc>,
}

pub async fn fetch_trade_logs(pool: &SqlitePool, strategy_id: &str) -> Result<Vec<TradeLogRow>> {
    let rows = sqlx::query(
        "select id, strategy_id, event_kind, payload_json, time from trade_logs where strategy_id = ? order by time asc",
    )
    .bind(strategy_id)
    .fetch_all(pool)
    .await
    .context("fetch_trade_logs failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let payload_str: String = row.try_get("payload_json")?;
        let time: String = row.try_get("time")?;
        out.push(TradeLogRow {
            id: row.try_get("id")?,
            strategy_id: row.try_get("strategy_id")?,
            event_kind: row.try_get("event_kind")?,
            payload_json: serde_json::from_str(&payload_str).context("parse trade log payload")?,
            time: DateTime::parse_from_rfc3339(&time)
                .context("parse trade log time")?
                .with_timezone(&Utc),
        });
    }
    Ok(out)
}
