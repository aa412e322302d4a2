//! HTTP routes for Tsophen
//!
//! The server collects each request into an `ApiRequest` before routing,
//! so handlers work on plain bytes and can be driven directly in tests.

pub mod auth;
pub mod health;
pub mod response;
pub mod users;
pub mod vault;

use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderName, AUTHORIZATION, COOKIE};
use hyper::{Method, Response};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::auth::{GateInputs, LoginBody};
use crate::server::AppState;
use crate::types::{Result, TsophenError};

pub use health::health_check;
pub use response::{apply_cors, error_response, BoxBody};

/// API version prefix shared by every resource
pub const API_PREFIX: &str = "/v1.0";

/// A fully-read request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body,
        }
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the body as JSON. An empty body counts as missing fields.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(TsophenError::MalformedInput(
                "Missing one of more fields [keys]".into(),
            ));
        }
        serde_json::from_slice(&self.body)
            .map_err(|_| TsophenError::MalformedInput("Invalid request syntax".into()))
    }

    /// Login body, where an empty body means no credentials were sent
    pub fn login_body(&self) -> Result<LoginBody> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(LoginBody::default());
        }
        self.json()
    }

    /// Transport material for the authorization gate
    pub fn gate_inputs(&self, login: Option<LoginBody>) -> GateInputs {
        GateInputs {
            authorization: self.header(AUTHORIZATION).map(String::from),
            cookie: self.header(COOKIE).map(String::from),
            login,
        }
    }
}

/// Route a request to its handler and add the CORS headers
pub async fn dispatch(state: &AppState, req: ApiRequest) -> Response<BoxBody> {
    let mut response = if req.method == Method::OPTIONS {
        response::preflight()
    } else {
        let path = normalize(&req.path).to_string();
        let result = route(state, &req, &path).await;
        result.unwrap_or_else(|err| {
            if matches!(
                err,
                TsophenError::Misconfiguration(_) | TsophenError::Database(_) | TsophenError::Internal(_)
            ) {
                error!("{} {} failed: {}", req.method, path, err);
            }
            error_response(err)
        })
    };

    apply_cors(response.headers_mut());
    response
}

async fn route(state: &AppState, req: &ApiRequest, path: &str) -> Result<Response<BoxBody>> {
    if path == "/health" {
        return Ok(match req.method {
            Method::GET => health_check(state),
            _ => response::method_not_allowed(),
        });
    }

    let Some(versioned) = path.strip_prefix(API_PREFIX) else {
        return Ok(response::not_found());
    };

    if let Some(rest) = versioned.strip_prefix(auth::PREFIX) {
        auth::handle(state, req, rest).await
    } else if let Some(rest) = versioned.strip_prefix(users::PREFIX) {
        users::handle(state, req, rest).await
    } else {
        Ok(response::not_found())
    }
}

/// Drop a trailing slash, keeping `/` itself
fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::Args;
    use crate::db::MemoryIdentityStore;
    use clap::Parser;
    use http_body_util::BodyExt;
    use hyper::header::HeaderValue;
    use std::sync::Arc;

    pub const SALT: &str = "salt-secret-for-tests";

    pub fn test_args() -> Args {
        Args::parse_from([
            "tsophen",
            "--salt-secret",
            SALT,
            "--jwt-access-secret",
            "access-secret-for-tests",
            "--jwt-refresh-secret",
            "refresh-secret-for-tests",
        ])
    }

    pub fn test_state() -> (AppState, Arc<MemoryIdentityStore>) {
        let store = Arc::new(MemoryIdentityStore::new());
        (AppState::new(test_args(), store.clone()), store)
    }

    pub fn request(method: Method, path: &str, body: serde_json::Value) -> ApiRequest {
        let body = if body.is_null() {
            Bytes::new()
        } else {
            Bytes::from(body.to_string())
        };
        ApiRequest::new(method, path, HeaderMap::new(), body)
    }

    pub fn with_bearer(mut req: ApiRequest, token: &str) -> ApiRequest {
        req.headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        req
    }

    pub fn with_cookie_header(mut req: ApiRequest, cookie: &str) -> ApiRequest {
        req.headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        req
    }

    pub async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        if bytes.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Create an account through the public endpoint and return its id
    pub async fn register(state: &AppState, email: &str, password: &str) -> String {
        let req = request(
            Method::POST,
            "/v1.0/users",
            serde_json::json!({ "email": email, "name": "Jane Doe", "password": password }),
        );
        let response = dispatch(state, req).await;
        assert_eq!(response.status(), hyper::StatusCode::CREATED);
        body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use hyper::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (state, _) = test_state();

        let response = dispatch(&state, request(Method::GET, "/v2.0/users", json!(null))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN));

        let body = body_json(response).await;
        assert_eq!(body, json!({ "success": false, "message": "Not found" }));
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let (state, _) = test_state();

        let response = dispatch(&state, request(Method::OPTIONS, "/v1.0/auth/login", json!(null))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state();

        let response = dispatch(&state, request(Method::GET, "/health", json!(null))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        let response = dispatch(&state, request(Method::POST, "/health", json!(null))).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/v1.0/users/"), "/v1.0/users");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn test_login_body_empty_and_invalid() {
        let empty = ApiRequest::new(Method::POST, "/", HeaderMap::new(), Bytes::new());
        assert!(empty.login_body().unwrap().email.is_none());

        let garbage = ApiRequest::new(Method::POST, "/", HeaderMap::new(), Bytes::from("{nope"));
        assert!(matches!(garbage.login_body(), Err(TsophenError::MalformedInput(_))));
    }
}
