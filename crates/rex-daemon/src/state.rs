//! Shared runtime state for rex-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns no
//! async logic itself — all of it lives on `ExecutorCore`.

use std::sync::Arc;

use rex_runtime::ExecutorCore;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<ExecutorCore>,
    pub build: BuildInfo,
}

#[derive(Clone)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "rex-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl AppState {
    pub fn new(executor: Arc<ExecutorCore>) -> Self {
        Self {
            executor,
            build: BuildInfo::default(),
        }
    }
}
