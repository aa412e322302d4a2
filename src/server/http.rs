//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{AuthorizationGate, PermissionTable, TokenService};
use crate::config::Args;
use crate::db::IdentityStore;
use crate::routes::{self, apply_cors, error_response, ApiRequest, BoxBody};
use crate::types::{Result, TsophenError};

/// Largest request body accepted, in bytes
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state, built once at startup
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn IdentityStore>,
    pub gate: Arc<AuthorizationGate>,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn IdentityStore>) -> Self {
        let secrets = args.secrets();
        let gate = AuthorizationGate::new(
            Arc::clone(&store),
            TokenService::new(args.token_config()),
            secrets.salt_secret.clone(),
            PermissionTable::standard(),
        );

        Self {
            args,
            store,
            gate: Arc::new(gate),
        }
    }

    /// Max-Age of the refresh token cookie
    pub fn refresh_cookie_max_age(&self) -> u64 {
        self.args.refresh_cookie_max_age_seconds
    }
}

/// Accept connections until the process exits
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Tsophen listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - missing secrets are tolerated");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Read the body under the size cap, then hand off to the router
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let reason = if e.downcast_ref::<LengthLimitError>().is_some() {
                "Request body too large"
            } else {
                "Failed to read request body"
            };
            warn!("[{}] {} {}: {}", addr, method, path, e);

            let mut response = error_response(TsophenError::MalformedInput(reason.into()));
            apply_cors(response.headers_mut());
            return Ok(response);
        }
    };

    let request = ApiRequest::new(parts.method, path.clone(), parts.headers, body);
    let response = routes::dispatch(&state, request).await;

    info!(
        "[{}] {} {} -> {} ({} ms)",
        addr,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    Ok(response)
}
