//! Identity store abstraction
//!
//! The gate and the route handlers only see this trait, so the MongoDB
//! backend can be swapped for the in-memory one in dev mode and tests.

use serde_json::Value;

use crate::db::schemas::{UserDoc, UserUpdate};
use crate::types::Result;

/// Lookup and mutation of user records.
///
/// Lookups return `Ok(None)` when nothing matches (including ids that are
/// not valid document ids). Mutations of a missing record return
/// `TsophenError::NotFound`; a duplicate email returns `Conflict`.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>>;

    async fn list(&self) -> Result<Vec<UserDoc>>;

    /// Insert a new user and return it with its id set
    async fn create(&self, user: UserDoc) -> Result<UserDoc>;

    /// Apply a field update and return the updated record
    async fn update_fields(&self, id: &str, update: UserUpdate) -> Result<UserDoc>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn load_vault(&self, id: &str) -> Result<Option<Value>>;

    async fn store_vault(&self, id: &str, vault: Value) -> Result<()>;
}
