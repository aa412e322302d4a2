//! Token endpoints
//!
//! - `POST /v1.0/auth/login`: credentials in, access token in the body and
//!   refresh token in the `refreshToken` cookie
//! - `POST /v1.0/auth/access-token`: credentials or refresh cookie in, new
//!   access token out
//! - `POST /v1.0/auth/refresh-token`: credentials in, new refresh cookie
//!   and access token out
//! - `POST /v1.0/auth/logout`: expires the refresh cookie
//!
//! Tokens are stateless. Logging out does not revoke tokens already issued.

use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use tracing::info;

use crate::auth::{Pipeline, RequestIdentity, Strategy};
use crate::routes::response::{
    cleared_refresh_cookie, message, method_not_allowed, not_found, refresh_cookie, success,
    with_cookie, BoxBody,
};
use crate::routes::ApiRequest;
use crate::server::AppState;
use crate::types::Result;

pub const PREFIX: &str = "/auth";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenData {
    pub access_token: String,
}

/// Route `/v1.0/auth/*`
pub async fn handle(state: &AppState, req: &ApiRequest, rest: &str) -> Result<Response<BoxBody>> {
    let known = matches!(rest, "/login" | "/access-token" | "/refresh-token" | "/logout");
    if !known {
        return Ok(not_found());
    }
    if req.method != Method::POST {
        return Ok(method_not_allowed());
    }

    match rest {
        "/login" => handle_login(state, req).await,
        "/access-token" => handle_access_token(state, req).await,
        "/refresh-token" => handle_refresh_token(state, req).await,
        _ => handle_logout(),
    }
}

async fn authenticate(state: &AppState, req: &ApiRequest, strategy: Strategy) -> Result<RequestIdentity> {
    let inputs = req.gate_inputs(Some(req.login_body()?));
    Pipeline::new()
        .authenticate(strategy)
        .run(&state.gate, &inputs)
        .await
}

/// POST /v1.0/auth/login
async fn handle_login(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let identity = authenticate(state, req, Strategy::Credentials).await?;

    let tokens = state.gate.tokens();
    let access = tokens.issue_access(&identity.user_id)?;
    let refresh = tokens.issue_refresh(&identity.user_id)?;

    info!("Issued access and refresh tokens for user {}", identity.user_id);

    let response = success(
        StatusCode::OK,
        "Successfully created Access Token",
        AccessTokenData {
            access_token: access.token,
        },
    );
    with_cookie(
        response,
        &refresh_cookie(&refresh.token, state.refresh_cookie_max_age()),
    )
}

/// POST /v1.0/auth/access-token
async fn handle_access_token(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let identity = authenticate(state, req, Strategy::CredentialsOrRefresh).await?;
    let access = state.gate.tokens().issue_access(&identity.user_id)?;

    info!(
        "Issued access token for user {} via {}",
        identity.user_id, identity.via
    );

    Ok(success(
        StatusCode::OK,
        "Successfully created Access Token",
        AccessTokenData {
            access_token: access.token,
        },
    ))
}

/// POST /v1.0/auth/refresh-token
async fn handle_refresh_token(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let identity = authenticate(state, req, Strategy::Credentials).await?;

    let tokens = state.gate.tokens();
    let refresh = tokens.issue_refresh(&identity.user_id)?;
    let access = tokens.issue_access(&identity.user_id)?;

    info!("Issued refresh token for user {}", identity.user_id);

    let response = success(
        StatusCode::OK,
        "Successfully created Refresh Token",
        AccessTokenData {
            access_token: access.token,
        },
    );
    with_cookie(
        response,
        &refresh_cookie(&refresh.token, state.refresh_cookie_max_age()),
    )
}

/// POST /v1.0/auth/logout
fn handle_logout() -> Result<Response<BoxBody>> {
    let response = message(StatusCode::OK, true, "Logged out successfully");
    with_cookie(response, &cleared_refresh_cookie())
}
