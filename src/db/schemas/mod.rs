//! Database schemas for Tsophen

mod metadata;
mod user;

pub use metadata::Metadata;
pub use user::{default_vault, UserDoc, UserUpdate, USER_COLLECTION};
