//! User document schema
//!
//! Stores the account, the PBKDF2 vault key, the role level and the
//! client-encrypted vault blob.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::Role;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Unique email address
    pub email: String,

    /// Full name
    pub name: String,

    /// Whether the email address was verified
    #[serde(default)]
    pub verified: bool,

    /// One-time token mailed out for email verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verification_token: Option<String>,

    /// Hex-encoded PBKDF2 output compared on login
    pub vault_key: String,

    /// Optional password reminder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Role level, see `Role`. A record without one is denied everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_level: Option<i32>,

    /// Client-encrypted vault, never interpreted by the server
    #[serde(default = "default_vault")]
    pub vault: Value,
}

/// Vault every new account starts with
pub fn default_vault() -> Value {
    json!({
        "passwords": {},
        "notes": {},
        "documents": {}
    })
}

impl UserDoc {
    /// Create a new user document
    pub fn new(
        email: String,
        name: String,
        vault_key: String,
        reminder: Option<String>,
        email_verification_token: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            name,
            verified: false,
            email_verification_token: Some(email_verification_token),
            vault_key,
            reminder,
            phone: None,
            permission_level: Some(Role::Default.level()),
            vault: default_vault(),
        }
    }

    /// Hex string form of the document id
    pub fn id_string(&self) -> Option<String> {
        self._id.map(|id| id.to_hex())
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email_verification_token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("email_verification_token_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Field changes allowed through the users resource.
///
/// Role level, vault key and vault are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub reminder: Option<String>,
    pub phone: Option<String>,
    pub verified: Option<bool>,
}

impl UserUpdate {
    /// `$set` body for MongoDB
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name.as_str());
        }
        if let Some(email) = &self.email {
            set.insert("email", email.as_str());
        }
        if let Some(reminder) = &self.reminder {
            set.insert("reminder", reminder.as_str());
        }
        if let Some(phone) = &self.phone {
            set.insert("phone", phone.as_str());
        }
        if let Some(verified) = self.verified {
            set.insert("verified", verified);
        }
        set
    }

    /// Apply to an in-memory document
    pub fn apply_to(&self, user: &mut UserDoc) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(reminder) = &self.reminder {
            user.reminder = Some(reminder.clone());
        }
        if let Some(phone) = &self.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(verified) = self.verified {
            user.verified = verified;
        }
        user.metadata.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = UserDoc::new(
            "u@x.com".into(),
            "Jane Doe".into(),
            "ab".repeat(64),
            None,
            "token".into(),
        );

        assert_eq!(user.permission_level, Some(1));
        assert!(!user.verified);
        assert_eq!(user.vault, default_vault());
        assert!(user.id_string().is_none());
    }

    #[test]
    fn test_bson_round_trip_keeps_vault() {
        let mut user = UserDoc::new(
            "u@x.com".into(),
            "Jane Doe".into(),
            "ab".repeat(64),
            Some("first pet".into()),
            "token".into(),
        );
        user._id = Some(ObjectId::new());
        user.vault = json!({ "passwords": { "cipher": "b64==" }, "notes": {}, "documents": {} });

        let doc = bson::to_document(&user).unwrap();
        assert!(doc.get_document("vault").is_ok());

        let back: UserDoc = bson::from_document(doc).unwrap();
        assert_eq!(back.vault, user.vault);
        assert_eq!(back.reminder.as_deref(), Some("first pet"));
    }

    #[test]
    fn test_missing_permission_level_stays_missing() {
        let doc = doc! {
            "email": "u@x.com",
            "name": "Jane Doe",
            "vault_key": "00",
        };
        let user: UserDoc = bson::from_document(doc).unwrap();
        assert_eq!(user.permission_level, None);
        assert_eq!(user.vault, default_vault());
    }

    #[test]
    fn test_update_set_document() {
        let update = UserUpdate {
            name: Some("New Name".into()),
            verified: Some(true),
            ..Default::default()
        };

        let set = update.to_set_document();
        assert_eq!(set.get_str("name").unwrap(), "New Name");
        assert!(set.get_bool("verified").unwrap());
        assert!(!set.contains_key("permission_level"));
        assert!(UserUpdate::default().to_set_document().is_empty());
    }
}
