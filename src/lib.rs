//! connect-console: deployments, logs and custom objects for commerce
//! projects, served as a JSON API and a CLI.
//!
//! The library holds everything except process setup so integration tests
//! in `tests/` can drive the router and the data layer directly.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logs;
pub mod models;
pub mod output;
pub mod platform;

use platform::Console;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub console: Console,
}
