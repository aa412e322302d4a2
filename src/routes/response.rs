//! Response helpers
//!
//! Every JSON body goes out as `{success, message, data?}`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, SET_COOKIE,
};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::auth::REFRESH_COOKIE;
use crate::types::{Result, TsophenError};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub const NOT_FOUND: &str = "Not found";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Successful envelope carrying `data`
pub fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response<BoxBody> {
    json_response(
        status,
        &Envelope {
            success: true,
            message: message.to_string(),
            data: Some(data),
        },
    )
}

/// Envelope without a data field
pub fn message(status: StatusCode, success: bool, message: &str) -> Response<BoxBody> {
    json_response(
        status,
        &Envelope::<()> {
            success,
            message: message.to_string(),
            data: None,
        },
    )
}

pub fn error_response(err: TsophenError) -> Response<BoxBody> {
    let (status, body) = err.into_status_code_and_body();
    message(status, false, &body)
}

pub fn no_content() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

pub fn not_found() -> Response<BoxBody> {
    message(StatusCode::NOT_FOUND, false, NOT_FOUND)
}

pub fn method_not_allowed() -> Response<BoxBody> {
    message(StatusCode::METHOD_NOT_ALLOWED, false, METHOD_NOT_ALLOWED)
}

/// CORS preflight answer
pub fn preflight() -> Response<BoxBody> {
    json_response(StatusCode::OK, &serde_json::json!({}))
}

/// Stamp the CORS headers onto any response
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Accept, Authorization, Content-Type, X-Requested-With, Origin"),
    );
}

/// `Set-Cookie` value carrying a refresh token
pub fn refresh_cookie(token: &str, max_age_seconds: u64) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Strict",
        REFRESH_COOKIE, token, max_age_seconds
    )
}

/// `Set-Cookie` value that expires the refresh token cookie
pub fn cleared_refresh_cookie() -> String {
    refresh_cookie("", 0)
}

pub fn with_cookie(mut response: Response<BoxBody>, cookie: &str) -> Result<Response<BoxBody>> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| TsophenError::Internal(format!("Invalid cookie header: {}", e)))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}
