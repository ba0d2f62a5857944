//! Hash-chained trade log writer, folded in from the teacher's append-only
//! audit writer: each `trade_logs` row carries `hash_prev`/`hash_self` so a
//! tampered or reordered row is detectable (`verify_hash_chain_str`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

pub struct NewTradeLogEvent<'a> {
    pub id: &'a str,
    pub strategy_id: &'a str,
    pub event_kind: &'a str,
    pub payload_json: Value,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct ChainedEvent<'a> {
    id: &'a str,
    strategy_id: &'a str,
    event_kind: &'a str,
    payload_json: &'a Value,
    time: DateTime<Utc>,
    hash_prev: Option<&'a str>,
}

/// Tracks the last-written hash per strategy so each append can be chained
/// without a round-trip query. Reconstruct at startup via
/// [`AuditChain::resume`].
#[derive(Default)]
pub struct AuditChain {
    last_hash: std::collections::HashMap<String, String>,
}

impl AuditChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds in-memory chain tips from the DB after a restart.
    pub async fn resume(pool: &SqlitePool) -> Result<Self> {
        let rows = sqlx::query(
            "select strategy_id, hash_self from trade_logs where hash_self is not null order by time asc",
        )
        .fetch_all(pool)
        .await
        .context("resume audit chain failed")?;

        let mut last_hash = std::collections::HashMap::new();
        for row in rows {
            let strategy_id: String = row.try_get("strategy_id")?;
            let hash_self: String = row.try_get("hash_self")?;
            last_hash.insert(strategy_id, hash_self);
        }
        Ok(Self { last_hash })
    }

    pub async fn append(&mut self, pool: &SqlitePool, ev: NewTradeLogEvent<'_>) -> Result<()> {
        let hash_prev = self.last_hash.get(ev.strategy_id).cloned();

        let chained = ChainedEvent {
            id: ev.id,
            strategy_id: ev.strategy_id,
            event_kind: ev.event_kind,
            payload_json: &ev.payload_json,
            time: ev.time,
            hash_prev: hash_prev.as_deref(),
        };
        let hash_self = compute_hash(&chained)?;

        let payload_str = serde_json::to_string(&ev.payload_json).context("serialize payload")?;
        sqlx::query(
            "insert into trade_logs (id, strategy_id, event_kind, payload_json, time, hash_prev, hash_self) values (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ev.id)
        .bind(ev.strategy_id)
        .bind(ev.event_kind)
        .bind(payload_str)
        .bind(ev.time.to_rfc3339())
        .bind(hash_prev.as_deref())
        .bind(&hash_self)
        .execute(pool)
        .await
        .context("insert trade_logs failed")?;

        self.last_hash.insert(ev.strategy_id.to_string(), hash_self);
        Ok(())
    }
}

fn compute_hash<T: Serialize>(v: &T) -> Result<String> {
    let canonical = serde_json::to_string(v).context("serialize for hashing")?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { rows: usize },
    Broken { row: usize, reason: String },
}

/// Verifies a strategy's trade_logs hash chain from already-fetched rows,
/// ordered oldest-first.
pub fn verify_hash_chain_str(rows: &[(String, Option<String>, Option<String>)]) -> VerifyResult {
    let mut prev: Option<&str> = None;
    for (i, (_id, hash_prev, hash_self)) in rows.iter().enumerate() {
        if hash_prev.as_deref() != prev {
            return VerifyResult::Broken {
                row: i,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev, hash_prev
                ),
            };
        }
        prev = hash_self.as_deref();
    }
    VerifyResult::Valid { rows: rows.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_broken_chain() {
        let rows = vec![
            ("e1".to_string(), None, Some("h1".to_string())),
            ("e2".to_string(), Some("WRONG".to_string()), Some("h2".to_string())),
        ];
        match verify_hash_chain_str(&rows) {
            VerifyResult::Broken { row, .. } => assert_eq!(row, 1),
            VerifyResult::Valid { .. } => panic!("expected a break"),
        }
    }

    #[test]
    fn accepts_a_correctly_chained_sequence() {
        let rows = vec![
            ("e1".to_string(), None, Some("h1".to_string())),
            ("e2".to_string(), Some("h1".to_string()), Some("h2".to_string())),
        ];
        assert_eq!(verify_hash_chain_str(&rows), VerifyResult::Valid { rows: 2 });
    }
}
