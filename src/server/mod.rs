//! HTTP server

mod http;

pub use http::{run, AppState, MAX_BODY_BYTES};
