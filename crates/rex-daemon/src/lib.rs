//! rex-daemon library target.
//!
//! Exposes the router and state for the scenario tests under `tests/`.
//! The `rex-daemon` binary (`main.rs`) depends on this library target.

pub mod api_types;
pub mod rate_limit;
pub mod routes;
pub mod state;
