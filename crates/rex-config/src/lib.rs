//! rex-config — layered YAML config loading + environment-sourced secrets
//! (spec §6).

mod layered;
mod secrets;

pub use layered::{load_layered_yaml, LoadedConfig};
pub use secrets::{resolve_executor_config, ExecutorConfig};
