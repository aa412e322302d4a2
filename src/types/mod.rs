//! Shared types for Tsophen

mod error;

pub use error::{Result, TsophenError, AUTHENTICATION_FAILED, INTERNAL_SERVER_ERROR};
