//! Users resource
//!
//! `POST /v1.0/users` is public. Every other method requires an access
//! token and a role that meets the permission table. The vault child
//! routes are matched before `/{userId}`.

use hyper::{Method, Response, StatusCode};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::auth::{
    derive_vault_key, is_valid_email, is_valid_full_name, validate_password_shape, Action,
    Pipeline, Resource, Strategy,
};
use crate::db::schemas::{UserDoc, UserUpdate};
use crate::routes::response::{method_not_allowed, no_content, not_found, success, BoxBody};
use crate::routes::{vault, ApiRequest};
use crate::server::AppState;
use crate::types::{Result, TsophenError};

pub const PREFIX: &str = "/users";

/// Length of the emailed verification token
pub const EMAIL_VERIFICATION_TOKEN_LEN: usize = 128;

const MISSING_FIELDS: &str = "Missing one of more fields [keys]";
const SUSPICIOUS_DATA: &str = "You submitted data that our system found suspicious. If you think what you did should have worked, please contact us";

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub reminder: Option<String>,
}

/// One `{property, value}` entry of an update request
#[derive(Debug, Deserialize)]
pub struct UpdateOperation {
    pub property: String,
    #[serde(default)]
    pub value: Value,
}

/// What any caller may see of another account
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl PublicUser {
    fn from_doc(user: &UserDoc) -> Option<Self> {
        Some(Self {
            id: user.id_string()?,
            email: user.email.clone(),
            name: user.name.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub email_verification_token: String,
}

/// Route `/v1.0/users` and everything below it
pub async fn handle(state: &AppState, req: &ApiRequest, rest: &str) -> Result<Response<BoxBody>> {
    match (req.method.clone(), rest) {
        (Method::POST, "") => create_user(state, req).await,
        (Method::GET, "") => list_users(state, req).await,
        (_, "") => Ok(method_not_allowed()),

        (_, vault::PATH) => vault::handle(state, req).await,

        (method, p) => {
            let Some(user_id) = p.strip_prefix('/').filter(|id| !id.is_empty() && !id.contains('/'))
            else {
                return Ok(not_found());
            };
            match method {
                Method::GET => load_user(state, req, user_id).await,
                Method::PUT => update_user(state, req, user_id).await,
                Method::DELETE => delete_user(state, req, user_id).await,
                _ => Ok(method_not_allowed()),
            }
        }
    }
}

/// Random alphanumeric token mailed out for address verification
pub fn generate_verification_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EMAIL_VERIFICATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

async fn authorize(state: &AppState, req: &ApiRequest, action: Action) -> Result<String> {
    let identity = Pipeline::new()
        .authenticate(Strategy::AccessToken)
        .require(Resource::Users, action)
        .run(&state.gate, &req.gate_inputs(None))
        .await?;
    Ok(identity.user_id)
}

/// POST /v1.0/users
async fn create_user(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let body: CreateUserRequest = req.json()?;

    let (Some(email), Some(name), Some(password)) = (body.email, body.name, body.password) else {
        return Err(TsophenError::MalformedInput(MISSING_FIELDS.into()));
    };
    if email.is_empty() || name.is_empty() || password.is_empty() {
        return Err(TsophenError::MalformedInput(MISSING_FIELDS.into()));
    }
    let password = Zeroizing::new(password);

    if !is_valid_email(&email) {
        return Err(TsophenError::MalformedInput("Invalid email".into()));
    }
    if !is_valid_full_name(&name) {
        return Err(TsophenError::MalformedInput("Invalid full name".into()));
    }
    if !validate_password_shape(&password) {
        return Err(TsophenError::MalformedInput(SUSPICIOUS_DATA.into()));
    }

    let salt = state
        .gate
        .salt_secret()
        .map(|s| Zeroizing::new(s.to_string()))
        .ok_or_else(|| TsophenError::Misconfiguration("SALT_SECRET is not set".into()))?;

    let vault_key =
        tokio::task::spawn_blocking(move || derive_vault_key(&password, &salt)).await??;

    let user = UserDoc::new(
        email,
        name,
        vault_key,
        body.reminder.filter(|r| !r.is_empty()),
        generate_verification_token(),
    );
    let created = state.store.create(user).await?;

    let id = created
        .id_string()
        .ok_or_else(|| TsophenError::Internal("created user has no id".into()))?;
    info!("Created user {}", id);

    Ok(success(
        StatusCode::CREATED,
        "Successfully created user",
        CreatedUser {
            id,
            email: created.email,
            name: created.name,
            email_verification_token: created.email_verification_token.unwrap_or_default(),
        },
    ))
}

/// GET /v1.0/users
async fn list_users(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    authorize(state, req, Action::ReadAll).await?;

    let users: Vec<PublicUser> = state
        .store
        .list()
        .await?
        .iter()
        .filter_map(PublicUser::from_doc)
        .collect();

    debug!("Loaded {} users", users.len());
    Ok(success(StatusCode::OK, "Successfully loaded all users", users))
}

/// GET /v1.0/users/{userId}
async fn load_user(state: &AppState, req: &ApiRequest, user_id: &str) -> Result<Response<BoxBody>> {
    authorize(state, req, Action::Read).await?;

    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .and_then(|u| PublicUser::from_doc(&u))
        .ok_or_else(|| TsophenError::NotFound("User not found".into()))?;

    Ok(success(StatusCode::OK, "Successfully loaded user", user))
}

/// PUT /v1.0/users/{userId}
async fn update_user(state: &AppState, req: &ApiRequest, user_id: &str) -> Result<Response<BoxBody>> {
    authorize(state, req, Action::UpdateAll).await?;

    let body: Value = req.json()?;
    let Value::Array(items) = body else {
        return Err(TsophenError::MalformedInput("Invalid request syntax".into()));
    };

    let operations = items
        .into_iter()
        .map(serde_json::from_value::<UpdateOperation>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| TsophenError::MalformedInput("Invalid request syntax".into()))?;

    let update = build_update(operations)?;
    let updated = state.store.update_fields(user_id, update).await?;

    info!("Updated user {}", user_id);

    let user = PublicUser::from_doc(&updated)
        .ok_or_else(|| TsophenError::Internal("updated user has no id".into()))?;
    Ok(success(StatusCode::OK, "Successfully updated user", user))
}

/// DELETE /v1.0/users/{userId}
async fn delete_user(state: &AppState, req: &ApiRequest, user_id: &str) -> Result<Response<BoxBody>> {
    authorize(state, req, Action::Delete).await?;

    state.store.delete(user_id).await?;
    info!("Deleted user {}", user_id);

    Ok(no_content())
}

/// Fold `{property, value}` operations into a typed update.
///
/// Only profile fields are accepted. Role level, vault key and vault are
/// rejected like any unknown property.
pub fn build_update(operations: Vec<UpdateOperation>) -> Result<UserUpdate> {
    if operations.is_empty() {
        return Err(TsophenError::MalformedInput("You didn't provide any properties".into()));
    }

    let mut update = UserUpdate::default();

    for op in operations {
        match (op.property.as_str(), op.value) {
            ("name", Value::String(name)) if is_valid_full_name(&name) => update.name = Some(name),
            ("name", _) => return Err(TsophenError::MalformedInput("Invalid full name".into())),

            ("email", Value::String(email)) if is_valid_email(&email) => update.email = Some(email),
            ("email", _) => return Err(TsophenError::MalformedInput("Invalid email".into())),

            ("reminder", Value::String(reminder)) => update.reminder = Some(reminder),
            ("phone", Value::String(phone)) => update.phone = Some(phone),
            ("verified", Value::Bool(verified)) => update.verified = Some(verified),

            (property, _) => {
                return Err(TsophenError::MalformedInput(format!(
                    "Property {} cannot be updated",
                    property
                )))
            }
        }
    }

    Ok(update)
}
