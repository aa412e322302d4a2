//! Liveness probe

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::response::{success, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Operating mode
    pub mode: &'static str,
    pub timestamp: String,
}

/// GET /health
///
/// Returns 200 whenever the process is serving requests.
pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let health = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.args.dev_mode { "development" } else { "production" },
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    success(StatusCode::OK, "OK", health)
}
