//! Authorization gate
//!
//! Every protected route declares an ordered list of steps: authenticate
//! the caller with one strategy, then require zero or more permissions.
//! Steps run in order and the first rejection ends the request.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::auth::jwt::{extract_bearer_token, extract_cookie, TokenKind, TokenService};
use crate::auth::password::{validate_password_shape, verify_password};
use crate::auth::permissions::{Action, PermissionTable, Resource};
use crate::auth::validation::is_valid_email;
use crate::db::IdentityStore;
use crate::types::{Result, TsophenError};

/// Name of the cookie that carries the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Compared against when the email is unknown so both failure paths pay
/// the same derivation cost
const UNKNOWN_USER_VAULT_KEY: &str = "0";

/// How a caller proves who they are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Email and password in the request body
    Credentials,
    /// Access token in `Authorization: Bearer`
    AccessToken,
    /// Refresh token in the `refreshToken` cookie
    RefreshToken,
    /// Credentials when the body carries them, otherwise the refresh cookie
    CredentialsOrRefresh,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Credentials => "credentials",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::CredentialsOrRefresh => "credentials_or_refresh",
        };
        f.write_str(name)
    }
}

/// Email/password body shared by the credential-bearing routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginBody {
    fn carries_credentials(&self) -> bool {
        self.email.is_some() || self.password.is_some()
    }
}

/// The parts of a request the gate looks at
#[derive(Debug, Clone, Default)]
pub struct GateInputs {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub login: Option<LoginBody>,
}

/// Who the gate decided the caller is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_id: String,
    pub via: Strategy,
}

/// One step of a route's gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStep {
    Authenticate(Strategy),
    RequirePermission(Resource, Action),
}

impl GateStep {
    pub fn name(&self) -> String {
        match self {
            Self::Authenticate(strategy) => format!("authenticate:{}", strategy),
            Self::RequirePermission(resource, action) => format!("require:{}:{}", resource, action),
        }
    }
}

/// Ordered gate declaration for one route
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<GateStep>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticate(mut self, strategy: Strategy) -> Self {
        self.steps.push(GateStep::Authenticate(strategy));
        self
    }

    pub fn require(mut self, resource: Resource, action: Action) -> Self {
        self.steps.push(GateStep::RequirePermission(resource, action));
        self
    }

    pub fn steps(&self) -> &[GateStep] {
        &self.steps
    }

    /// Run every step in order, stopping at the first rejection.
    ///
    /// A pipeline that never authenticates yields no identity and is
    /// rejected, as is a permission step that runs before authentication.
    pub async fn run(&self, gate: &AuthorizationGate, inputs: &GateInputs) -> Result<RequestIdentity> {
        let mut identity: Option<RequestIdentity> = None;

        for step in &self.steps {
            let outcome = match step {
                GateStep::Authenticate(strategy) => gate
                    .authenticate(*strategy, inputs)
                    .await
                    .map(|id| identity = Some(id)),
                GateStep::RequirePermission(resource, action) => match &identity {
                    Some(id) => gate.check_permission(id, *resource, *action).await,
                    None => Err(TsophenError::PermissionDenied(
                        "permission step ran before authentication".into(),
                    )),
                },
            };

            match outcome {
                Ok(()) => debug!("Gate step {} passed", step.name()),
                Err(e) => {
                    warn!("Gate step {} rejected: {}", step.name(), e);
                    return Err(e);
                }
            }
        }

        identity.ok_or_else(|| TsophenError::Internal("gate pipeline has no authenticate step".into()))
    }
}

/// Holds everything the gate steps need: the store, the token service,
/// the salt secret and the permission table.
pub struct AuthorizationGate {
    store: Arc<dyn IdentityStore>,
    tokens: TokenService,
    salt_secret: Option<Zeroizing<String>>,
    permissions: PermissionTable,
}

impl AuthorizationGate {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        tokens: TokenService,
        salt_secret: Option<String>,
        permissions: PermissionTable,
    ) -> Self {
        Self {
            store,
            tokens,
            salt_secret: salt_secret.filter(|s| !s.is_empty()).map(Zeroizing::new),
            permissions,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn salt_secret(&self) -> Option<&str> {
        self.salt_secret.as_deref().map(String::as_str)
    }

    /// Authenticate with one strategy
    pub async fn authenticate(&self, strategy: Strategy, inputs: &GateInputs) -> Result<RequestIdentity> {
        let (user_id, via) = match strategy {
            Strategy::Credentials => (self.check_credentials(inputs.login.as_ref()).await?, strategy),
            Strategy::AccessToken => (self.check_access_token(inputs)?, strategy),
            Strategy::RefreshToken => (self.check_refresh_token(inputs)?, strategy),
            Strategy::CredentialsOrRefresh => {
                if inputs.login.as_ref().is_some_and(LoginBody::carries_credentials) {
                    let id = self.check_credentials(inputs.login.as_ref()).await?;
                    (id, Strategy::Credentials)
                } else if extract_cookie(inputs.cookie.as_deref(), REFRESH_COOKIE).is_some() {
                    (self.check_refresh_token(inputs)?, Strategy::RefreshToken)
                } else {
                    return Err(TsophenError::MalformedInput(
                        "Missing credentials or refresh token".into(),
                    ));
                }
            }
        };

        Ok(RequestIdentity { user_id, via })
    }

    async fn check_credentials(&self, login: Option<&LoginBody>) -> Result<String> {
        let (email, password) = match login {
            Some(LoginBody {
                email: Some(email),
                password: Some(password),
            }) if !email.is_empty() && !password.is_empty() => (email.as_str(), password),
            _ => {
                return Err(TsophenError::MalformedInput(
                    "Missing one or more fields [email, password]".into(),
                ))
            }
        };

        if !is_valid_email(email) {
            return Err(TsophenError::MalformedInput("Invalid email".into()));
        }

        if !validate_password_shape(password) {
            return Err(TsophenError::MalformedInput(
                "You have submitted suspicious data. Please verify your input".into(),
            ));
        }

        let salt = self
            .salt_secret
            .clone()
            .ok_or_else(|| TsophenError::Misconfiguration("SALT_SECRET is not set".into()))?;

        let user = self.store.find_by_email(email).await?;

        let (stored, user_id) = match &user {
            Some(user) => (user.vault_key.clone(), user.id_string()),
            None => (UNKNOWN_USER_VAULT_KEY.to_string(), None),
        };

        let password = Zeroizing::new(password.clone());
        let matched = tokio::task::spawn_blocking(move || {
            verify_password(&password, Some(&stored), Some(salt.as_str()))
        })
        .await?;

        match (user, matched) {
            (None, _) => Err(TsophenError::CredentialMismatch("no such account".into())),
            (Some(_), false) => Err(TsophenError::CredentialMismatch("wrong password".into())),
            (Some(_), true) => {
                user_id.ok_or_else(|| TsophenError::Internal("stored user has no id".into()))
            }
        }
    }

    fn check_access_token(&self, inputs: &GateInputs) -> Result<String> {
        let token = extract_bearer_token(inputs.authorization.as_deref()).ok_or_else(|| {
            TsophenError::MalformedInput("Missing or malformed authorization header".into())
        })?;
        self.tokens.verify(token, TokenKind::Access)
    }

    fn check_refresh_token(&self, inputs: &GateInputs) -> Result<String> {
        let token = extract_cookie(inputs.cookie.as_deref(), REFRESH_COOKIE)
            .ok_or_else(|| TsophenError::MalformedInput("Missing refresh token".into()))?;
        self.tokens.verify(token, TokenKind::Refresh)
    }

    /// Deny unless the caller's stored role meets the table's minimum
    pub async fn check_permission(
        &self,
        identity: &RequestIdentity,
        resource: Resource,
        action: Action,
    ) -> Result<()> {
        let Some(user) = self.store.find_by_id(&identity.user_id).await? else {
            return Err(TsophenError::PermissionDenied(format!(
                "no user {} to load permissions for",
                identity.user_id
            )));
        };

        let Some(level) = user.permission_level.filter(|level| *level > 0) else {
            return Err(TsophenError::PermissionDenied(format!(
                "user {} has no role",
                identity.user_id
            )));
        };

        if !self.permissions.is_allowed(level, resource, action) {
            return Err(TsophenError::PermissionDenied(format!(
                "level {} may not {} on {}",
                level, action, resource
            )));
        }

        Ok(())
    }
}
