//! Environment-sourced secret resolution (spec §6).
//!
//! Config YAML stores only env var NAMES; values are read once at startup
//! via [`resolve_executor_config`] and never re-read from `std::env`
//! elsewhere. `Debug` on [`ExecutorConfig`] redacts `api_key`/`api_secret`.

use anyhow::{bail, Result};
use serde_json::Value;

#[derive(Clone)]
pub struct ExecutorConfig {
    pub platform_base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub executor_id: String,
    pub broker_terminal_path: Option<String>,
    pub http_host: String,
    pub http_port: u16,
    pub env: String,
    pub debug: bool,
}

impl std::fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("platform_base_url", &self.platform_base_url)
            .field("api_key", &"<REDACTED>")
            .field("api_secret", &"<REDACTED>")
            .field("executor_id", &self.executor_id)
            .field("broker_terminal_path", &self.broker_terminal_path)
            .field("http_host", &self.http_host)
            .field("http_port", &self.http_port)
            .field("env", &self.env)
            .field("debug", &self.debug)
            .finish()
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolves the executor's environment-sourced configuration (spec §6).
/// `config_json` supplies non-secret fields plus the env var NAMES for
/// `api_key`/`api_secret`; `debug` defaults to `false` when absent.
pub fn resolve_executor_config(config_json: &Value) -> Result<ExecutorConfig> {
    let platform_base_url = read_str_at(config_json, "/platformBaseUrl")
        .ok_or_else(|| anyhow::anyhow!("CONFIG_MISSING: /platformBaseUrl"))?;

    let api_key_var = read_str_at(config_json, "/secretsEnv/apiKey")
        .unwrap_or_else(|| "REX_API_KEY".to_string());
    let api_secret_var = read_str_at(config_json, "/secretsEnv/apiSecret")
        .unwrap_or_else(|| "REX_API_SECRET".to_string());

    let api_key = resolve_env(&api_key_var)
        .ok_or_else(|| anyhow::anyhow!("SECRETS_MISSING: env var '{api_key_var}' is not set or empty"))?;
    let api_secret = resolve_env(&api_secret_var).ok_or_else(|| {
        anyhow::anyhow!("SECRETS_MISSING: env var '{api_secret_var}' is not set or empty")
    })?;

    let executor_id = read_str_at(config_json, "/executorId")
        .ok_or_else(|| anyhow::anyhow!("CONFIG_MISSING: /executorId"))?;

    let broker_terminal_path = read_str_at(config_json, "/brokerTerminalPath");
    let http_host =
        read_str_at(config_json, "/httpHost").unwrap_or_else(|| "127.0.0.1".to_string());
    let http_port = config_json
        .pointer("/httpPort")
        .and_then(Value::as_u64)
        .map(|p| p as u16)
        .unwrap_or(8787);
    let env = read_str_at(config_json, "/env").unwrap_or_else(|| "dev".to_string());
    let debug = config_json
        .pointer("/debug")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !["dev", "staging", "prod"].contains(&env.as_str()) {
        bail!("CONFIG_INVALID: unrecognised env '{env}'");
    }

    Ok(ExecutorConfig {
        platform_base_url,
        api_key,
        api_secret,
        executor_id,
        broker_terminal_path,
        http_host,
        http_port,
        env,
        debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Value {
        serde_json::json!({
            "platformBaseUrl": "https://platform.example.test",
            "executorId": "exec-1",
            "httpHost": "0.0.0.0",
            "httpPort": 9090,
            "env": "prod",
        })
    }

    #[test]
    fn missing_secrets_is_an_error_naming_the_var() {
        std::env::remove_var("REX_API_KEY");
        std::env::remove_var("REX_API_SECRET");
        let err = resolve_executor_config(&base_config()).unwrap_err();
        assert!(err.to_string().contains("REX_API_KEY"));
    }

    #[test]
    fn debug_is_redacted() {
        std::env::set_var("REX_API_KEY", "shh-key");
        std::env::set_var("REX_API_SECRET", "shh-secret");
        let cfg = resolve_executor_config(&base_config()).unwrap();
        let debug_str = format!("{cfg:?}");
        assert!(!debug_str.contains("shh-key"));
        assert!(!debug_str.contains("shh-secret"));
        assert_eq!(cfg.http_port, 9090);
    }
}
