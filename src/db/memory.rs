//! In-memory identity store
//!
//! Used when MongoDB is unavailable in dev mode, and by the test suite.
//! Email uniqueness is enforced through a second map, mirroring the unique
//! index on the MongoDB collection.

use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::db::schemas::{Metadata, UserDoc, UserUpdate};
use crate::db::store::IdentityStore;
use crate::types::{Result, TsophenError};

#[derive(Default)]
pub struct MemoryIdentityStore {
    /// id (hex) -> user
    users: DashMap<String, UserDoc>,
    /// email -> id (hex)
    emails: DashMap<String, String>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's role level. Administrative tooling only.
    pub fn set_permission_level(&self, id: &str, level: i32) -> Result<()> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| TsophenError::NotFound("User not found".into()))?;
        user.permission_level = Some(level);
        user.metadata.touch();
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let Some(id) = self.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn list(&self) -> Result<Vec<UserDoc>> {
        Ok(self.users.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn create(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = ObjectId::new();

        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(TsophenError::Conflict("Email already in use".into())),
            Entry::Vacant(slot) => {
                slot.insert(id.to_hex());
            }
        }

        user._id = Some(id);
        user.metadata = Metadata::new();
        self.users.insert(id.to_hex(), user.clone());
        Ok(user)
    }

    async fn update_fields(&self, id: &str, update: UserUpdate) -> Result<UserDoc> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| TsophenError::NotFound("User not found".into()))?;

        if let Some(new_email) = &update.email {
            if *new_email != user.email {
                match self.emails.entry(new_email.clone()) {
                    Entry::Occupied(_) => {
                        return Err(TsophenError::Conflict("Email already in use".into()))
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(id.to_string());
                    }
                }
                self.emails.remove(&user.email);
            }
        }

        update.apply_to(&mut *user);
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| TsophenError::NotFound("User not found".into()))?;
        self.emails.remove(&user.email);
        Ok(())
    }

    async fn load_vault(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.users.get(id).map(|u| u.vault.clone()))
    }

    async fn store_vault(&self, id: &str, vault: Value) -> Result<()> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| TsophenError::NotFound("User not found".into()))?;
        user.vault = vault;
        user.metadata.touch();
        Ok(())
    }
}
