//! MongoDB-backed identity store

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use serde_json::Value;
use tracing::debug;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{UserDoc, UserUpdate, USER_COLLECTION};
use crate::db::store::IdentityStore;
use crate::types::{Result, TsophenError};

/// Identity store over the `users` collection
#[derive(Clone)]
pub struct MongoIdentityStore {
    users: MongoCollection<UserDoc>,
}

impl MongoIdentityStore {
    /// Open the users collection and apply its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        Ok(Self { users })
    }
}

/// Filter on `_id`, or None when the id is not an ObjectId
fn id_filter(id: &str) -> Option<Document> {
    ObjectId::parse_str(id).ok().map(|oid| doc! { "_id": oid })
}

#[async_trait]
impl IdentityStore for MongoIdentityStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserDoc>> {
        match id_filter(id) {
            Some(filter) => self.users.find_one(filter).await,
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn list(&self) -> Result<Vec<UserDoc>> {
        self.users.find_many(doc! {}).await
    }

    async fn create(&self, mut user: UserDoc) -> Result<UserDoc> {
        let id = self.users.insert_one(user.clone()).await?;
        debug!("Inserted user {}", id);
        user._id = Some(id);
        Ok(user)
    }

    async fn update_fields(&self, id: &str, update: UserUpdate) -> Result<UserDoc> {
        let filter =
            id_filter(id).ok_or_else(|| TsophenError::NotFound("User not found".into()))?;

        self.users
            .set_and_return(filter, update.to_set_document())
            .await?
            .ok_or_else(|| TsophenError::NotFound("User not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let filter =
            id_filter(id).ok_or_else(|| TsophenError::NotFound("User not found".into()))?;

        if self.users.delete_one(filter).await? {
            Ok(())
        } else {
            Err(TsophenError::NotFound("User not found".into()))
        }
    }

    async fn load_vault(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.find_by_id(id).await?.map(|user| user.vault))
    }

    async fn store_vault(&self, id: &str, vault: Value) -> Result<()> {
        let filter =
            id_filter(id).ok_or_else(|| TsophenError::NotFound("User not found".into()))?;

        let set = doc! { "vault": bson::to_bson(&vault)? };
        self.users
            .set_and_return(filter, set)
            .await?
            .map(|_| ())
            .ok_or_else(|| TsophenError::NotFound("User not found".into()))
    }
}
