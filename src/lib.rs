//! Tsophen - password vault account service
//!
//! Tsophen keeps user accounts and their client-encrypted vaults, and
//! decides who may touch them.
//!
//! ## Pieces
//!
//! - **Credentials**: PBKDF2-SHA512 vault keys, compared in constant time
//! - **Tokens**: short-lived access and long-lived refresh JWTs, each with
//!   its own secret
//! - **Permissions**: static table of minimum role per action
//! - **Gate**: per-route pipeline of authenticate and require steps

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TsophenError};
