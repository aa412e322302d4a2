//! Caller's own vault
//!
//! The vault is encrypted client-side and stored as an opaque document.
//! It is only ever addressed through the identity the gate resolved.

use hyper::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{Action, Pipeline, Resource, Strategy};
use crate::routes::response::{message, method_not_allowed, success, BoxBody};
use crate::routes::ApiRequest;
use crate::server::AppState;
use crate::types::{Result, TsophenError};

/// Path below `/v1.0/users`
pub const PATH: &str = "/vault";

#[derive(Debug, Deserialize)]
pub struct UpdateVaultRequest {
    #[serde(default)]
    pub vault: Value,
}

pub async fn handle(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    match req.method {
        Method::GET => get_vault(state, req).await,
        Method::PATCH => update_vault(state, req).await,
        _ => Ok(method_not_allowed()),
    }
}

async fn owner(state: &AppState, req: &ApiRequest, action: Action) -> Result<String> {
    let identity = Pipeline::new()
        .authenticate(Strategy::AccessToken)
        .require(Resource::Users, action)
        .run(&state.gate, &req.gate_inputs(None))
        .await?;
    Ok(identity.user_id)
}

/// GET /v1.0/users/vault
async fn get_vault(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let user_id = owner(state, req, Action::ReadOwn).await?;

    let vault = state
        .store
        .load_vault(&user_id)
        .await?
        .ok_or_else(|| TsophenError::NotFound("Failed to load vault".into()))?;

    debug!("Loaded vault of user {}", user_id);
    Ok(success(StatusCode::OK, "Successfully loaded vault", vault))
}

/// PATCH /v1.0/users/vault
async fn update_vault(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let user_id = owner(state, req, Action::UpdateOwn).await?;

    let body: UpdateVaultRequest = req.json()?;
    if body.vault.is_null() {
        return Err(TsophenError::MalformedInput(
            "Missing one of more fields [keys]".into(),
        ));
    }

    state.store.store_vault(&user_id, body.vault).await?;
    info!("Updated vault of user {}", user_id);

    Ok(message(StatusCode::OK, true, "Successfully updated vault"))
}
