/// Error taxonomy for `ExecutorCore` operations (spec §7 `ConfigError`
/// class plus the round-trip/idempotence laws in §8).
#[derive(Debug)]
pub enum ExecutorError {
    /// No runtime registered under the given strategy id.
    NotFound(String),
    /// The `StrategyConfig` failed its own invariants (spec §3).
    InvalidConfig(String),
    Db(anyhow::Error),
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "no strategy runtime for id '{id}'"),
            Self::InvalidConfig(msg) => write!(f, "invalid strategy config: {msg}"),
            Self::Db(e) => write!(f, "persistence error: {e}"),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<anyhow::Error> for ExecutorError {
    fn from(e: anyhow::Error) -> Self {
        ExecutorError::Db(e)
    }
}
