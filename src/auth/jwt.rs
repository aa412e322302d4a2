//! Access and refresh token handling
//!
//! Both token kinds are HS256 JWTs carrying the user id, the token kind,
//! issue time and expiry. Each kind is signed with its own secret.
//!
//! Security notes:
//! - Tokens are stateless; nothing is persisted on issue
//! - Expiry is an exclusive upper bound: a token checked at exactly `exp`
//!   is rejected
//! - Every verification failure collapses to one `VerificationFailure`

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Result, TsophenError};

/// Default access token lifetime (5 minutes)
pub const DEFAULT_ACCESS_EXPIRY_SECONDS: u64 = 5 * 60;

/// Default refresh token lifetime (30 days)
pub const DEFAULT_REFRESH_EXPIRY_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Longest lifetime accepted for either token kind (one year)
pub const MAX_EXPIRY_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Which secret and lifetime a token uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Payload stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: String,
    /// Token kind, checked on verification
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// The single rejection outcome of token verification.
///
/// Bad signature, expiry, malformed payload and missing identity are not
/// distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("token verification failed")]
pub struct VerificationFailure;

impl From<VerificationFailure> for TsophenError {
    fn from(_: VerificationFailure) -> Self {
        TsophenError::CredentialMismatch("token verification failed".into())
    }
}

/// Secrets and lifetimes for both token kinds
#[derive(Clone, Default)]
pub struct TokenConfig {
    pub access_secret: Option<String>,
    pub refresh_secret: Option<String>,
    pub access_expiry_seconds: u64,
    pub refresh_expiry_seconds: u64,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &self.access_secret.as_ref().map(|_| "<set>"))
            .field("refresh_secret", &self.refresh_secret.as_ref().map(|_| "<set>"))
            .field("access_expiry_seconds", &self.access_expiry_seconds)
            .field("refresh_expiry_seconds", &self.refresh_expiry_seconds)
            .finish()
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: u64,
}

/// Token issuer and verifier
#[derive(Clone, Debug)]
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    fn secret(&self, kind: TokenKind) -> Result<&str> {
        let secret = match kind {
            TokenKind::Access => self.config.access_secret.as_deref(),
            TokenKind::Refresh => self.config.refresh_secret.as_deref(),
        };

        secret.filter(|s| !s.is_empty()).ok_or_else(|| {
            TsophenError::Misconfiguration(format!("no {} token secret configured", kind))
        })
    }

    fn expiry_seconds(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Access => self.config.access_expiry_seconds,
            TokenKind::Refresh => self.config.refresh_expiry_seconds,
        }
    }

    /// Issue a short-lived access token
    pub fn issue_access(&self, user_id: &str) -> Result<IssuedToken> {
        self.issue_at(TokenKind::Access, user_id, now_seconds())
    }

    /// Issue a long-lived refresh token
    pub fn issue_refresh(&self, user_id: &str) -> Result<IssuedToken> {
        self.issue_at(TokenKind::Refresh, user_id, now_seconds())
    }

    /// Issue a token as of `now`.
    ///
    /// The secret is checked before anything is signed.
    pub fn issue_at(&self, kind: TokenKind, user_id: &str, now: u64) -> Result<IssuedToken> {
        let secret = self.secret(kind)?;

        if user_id.is_empty() {
            return Err(TsophenError::Internal("cannot issue a token without a user id".into()));
        }

        let exp = now.checked_add(self.expiry_seconds(kind)).ok_or_else(|| {
            TsophenError::Misconfiguration(format!("{} token expiry overflows", kind))
        })?;

        let claims = Claims {
            id: user_id.to_string(),
            kind,
            iat: now,
            exp,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TsophenError::Internal(format!("Failed to sign {} token: {}", kind, e)))?;

        Ok(IssuedToken {
            token,
            kind,
            expires_at: claims.exp,
        })
    }

    /// Verify a token of the given kind and return the embedded user id
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<String> {
        self.verify_at(token, kind, now_seconds())
    }

    /// Verify a token as of `now`
    pub fn verify_at(&self, token: &str, kind: TokenKind, now: u64) -> Result<String> {
        let secret = self.secret(kind)?;
        let claims = verify_token(token, secret, kind, now)?;
        Ok(claims.id)
    }
}

/// Verify a token's signature, kind and expiry.
pub fn verify_token(
    token: &str,
    secret: &str,
    expected: TokenKind,
    now: u64,
) -> std::result::Result<Claims, VerificationFailure> {
    if token.is_empty() || secret.is_empty() {
        return Err(VerificationFailure);
    }

    // Expiry is checked below against `now` so the boundary is exclusive
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| VerificationFailure)?;

    if now >= claims.exp || claims.kind != expected || claims.id.is_empty() {
        return Err(VerificationFailure);
    }

    Ok(claims)
}

/// Current Unix time in seconds
pub fn now_seconds() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Extract the token from a bearer-style header.
///
/// The token is the second whitespace-delimited word after the `Bearer`
/// scheme. Anything else is rejected.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let mut parts = auth_header?.split_whitespace();

    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// Extract a named cookie from a `Cookie` header
pub fn extract_cookie<'a>(cookie_header: Option<&'a str>, name: &str) -> Option<&'a str> {
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn test_service() -> TokenService {
        TokenService::new(TokenConfig {
            access_secret: Some("access-secret-for-tests".into()),
            refresh_secret: Some("refresh-secret-for-tests".into()),
            access_expiry_seconds: DEFAULT_ACCESS_EXPIRY_SECONDS,
            refresh_expiry_seconds: DEFAULT_REFRESH_EXPIRY_SECONDS,
        })
    }

    #[test]
    fn test_issue_and_verify_access() {
        let service = test_service();

        let issued = service.issue_at(TokenKind::Access, "user-123", NOW).unwrap();
        assert!(!issued.token.is_empty());
        assert_eq!(issued.expires_at, NOW + DEFAULT_ACCESS_EXPIRY_SECONDS);

        let id = service
            .verify_at(&issued.token, TokenKind::Access, NOW + 1)
            .unwrap();
        assert_eq!(id, "user-123");
    }

    #[test]
    fn test_issue_and_verify_refresh() {
        let service = test_service();

        let issued = service.issue_at(TokenKind::Refresh, "user-123", NOW).unwrap();
        assert_eq!(issued.expires_at, NOW + DEFAULT_REFRESH_EXPIRY_SECONDS);

        // Still valid long after an access token would have expired
        let later = NOW + 7 * 24 * 60 * 60;
        let id = service
            .verify_at(&issued.token, TokenKind::Refresh, later)
            .unwrap();
        assert_eq!(id, "user-123");
    }

    #[test]
    fn test_live_clock_round_trip() {
        let service = test_service();
        let issued = service.issue_access("user-live").unwrap();
        assert_eq!(
            service.verify(&issued.token, TokenKind::Access).unwrap(),
            "user-live"
        );
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let service = test_service();
        let issued = service.issue_at(TokenKind::Access, "user-123", NOW).unwrap();

        let last_valid = issued.expires_at - 1;
        assert!(service
            .verify_at(&issued.token, TokenKind::Access, last_valid)
            .is_ok());

        let result = service.verify_at(&issued.token, TokenKind::Access, issued.expires_at);
        assert!(matches!(result, Err(TsophenError::CredentialMismatch(_))));
    }

    #[test]
    fn test_wrong_secret_looks_like_expired() {
        let service = test_service();
        let other = TokenService::new(TokenConfig {
            access_secret: Some("a-completely-different-secret".into()),
            ..test_service().config
        });

        let forged = other.issue_at(TokenKind::Access, "user-123", NOW).unwrap();
        let expired = service.issue_at(TokenKind::Access, "user-123", NOW).unwrap();

        let secret = "access-secret-for-tests";
        let forged_result = verify_token(&forged.token, secret, TokenKind::Access, NOW + 1);
        let expired_result = verify_token(
            &expired.token,
            secret,
            TokenKind::Access,
            expired.expires_at + 10,
        );

        assert_eq!(forged_result.unwrap_err(), VerificationFailure);
        assert_eq!(expired_result.unwrap_err(), VerificationFailure);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let service = test_service();
        let refresh = service.issue_at(TokenKind::Refresh, "user-123", NOW).unwrap();

        assert!(service
            .verify_at(&refresh.token, TokenKind::Access, NOW + 1)
            .is_err());

        // Even when both kinds share a key, the kind claim must match
        let claims = verify_token(
            &refresh.token,
            "refresh-secret-for-tests",
            TokenKind::Access,
            NOW + 1,
        );
        assert!(claims.is_err());
    }

    #[test]
    fn test_multiple_tokens_stay_valid() {
        let service = test_service();

        let first = service.issue_at(TokenKind::Access, "user-123", NOW).unwrap();
        let second = service.issue_at(TokenKind::Access, "user-123", NOW + 30).unwrap();

        assert!(service.verify_at(&first.token, TokenKind::Access, NOW + 31).is_ok());
        assert!(service.verify_at(&second.token, TokenKind::Access, NOW + 31).is_ok());
    }

    #[test]
    fn test_malformed_tokens() {
        let secret = "access-secret-for-tests";
        assert!(verify_token("", secret, TokenKind::Access, NOW).is_err());
        assert!(verify_token("invalid-token", secret, TokenKind::Access, NOW).is_err());
        assert!(verify_token("a.b.c", secret, TokenKind::Access, NOW).is_err());
    }

    #[test]
    fn test_missing_identity_rejected() {
        #[derive(Serialize)]
        struct NoId {
            #[serde(rename = "type")]
            kind: TokenKind,
            iat: u64,
            exp: u64,
        }

        let secret = "access-secret-for-tests";
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoId {
                kind: TokenKind::Access,
                iat: NOW,
                exp: NOW + 60,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&token, secret, TokenKind::Access, NOW + 1).is_err());
    }

    #[test]
    fn test_missing_secret_is_misconfiguration() {
        let service = TokenService::new(TokenConfig {
            access_secret: None,
            refresh_secret: Some(String::new()),
            access_expiry_seconds: 300,
            refresh_expiry_seconds: 600,
        });

        assert!(matches!(
            service.issue_access("user-123"),
            Err(TsophenError::Misconfiguration(_))
        ));
        assert!(matches!(
            service.issue_refresh("user-123"),
            Err(TsophenError::Misconfiguration(_))
        ));
        assert!(matches!(
            service.verify("whatever", TokenKind::Access),
            Err(TsophenError::Misconfiguration(_))
        ));
    }

    #[test]
    fn test_overflowing_expiry_is_misconfiguration() {
        let service = TokenService::new(TokenConfig {
            refresh_expiry_seconds: u64::MAX,
            ..test_service().config
        });

        assert!(matches!(
            service.issue_refresh("user-123"),
            Err(TsophenError::Misconfiguration(_))
        ));
        assert!(service.issue_access("user-123").is_ok());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_bearer_token(Some("bearer   abc123 ")), Some("abc123"));

        assert_eq!(extract_bearer_token(None), None);
        assert_eq!(extract_bearer_token(Some("")), None);
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("abc123")), None);
        assert_eq!(extract_bearer_token(Some("Basic abc123")), None);
        assert_eq!(extract_bearer_token(Some("Bearer abc 123")), None);
    }

    #[test]
    fn test_extract_cookie() {
        let header = Some("theme=dark; refreshToken=abc.def.ghi; other=1");
        assert_eq!(extract_cookie(header, "refreshToken"), Some("abc.def.ghi"));
        assert_eq!(extract_cookie(header, "missing"), None);
        assert_eq!(extract_cookie(Some("refreshToken="), "refreshToken"), None);
        assert_eq!(extract_cookie(None, "refreshToken"), None);
    }
}
