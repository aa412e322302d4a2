//! Configuration for Tsophen
//!
//! CLI arguments and environment variable handling using clap.
//! Secrets are copied out of `Args` once at startup into immutable values
//! that are handed to the components that need them.

use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::auth::{TokenConfig, MAX_EXPIRY_SECONDS};

/// Tsophen - password vault account service
#[derive(Parser, Debug, Clone)]
#[command(name = "tsophen")]
#[command(about = "Account, token and vault service for Tsophen")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "tsophen")]
    pub mongodb_db: String,

    /// Salt secret fed to PBKDF2 when deriving vault keys
    #[arg(long, env = "SALT_SECRET", hide_env_values = true)]
    pub salt_secret: Option<String>,

    /// HMAC secret for access tokens
    #[arg(long, env = "JWT_ACCESS_SECRET", hide_env_values = true)]
    pub jwt_access_secret: Option<String>,

    /// HMAC secret for refresh tokens (must differ from the access secret)
    #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
    pub jwt_refresh_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY_SECONDS", default_value = "300")]
    pub access_token_expiry_seconds: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY_SECONDS", default_value = "2592000")]
    pub refresh_token_expiry_seconds: u64,

    /// Max-Age of the refresh token cookie in seconds
    #[arg(long, env = "REFRESH_COOKIE_MAX_AGE_SECONDS", default_value = "604800")]
    pub refresh_cookie_max_age_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable development mode (in-memory store fallback, secrets optional)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,
}

/// Process-wide secrets, fixed at startup.
///
/// Every field stays optional: components check presence at point of use
/// and fail with `Misconfiguration` instead of signing with nothing.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Secrets {
    pub salt_secret: Option<String>,
    pub access_secret: Option<String>,
    pub refresh_secret: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |s: &Option<String>| if s.is_some() { "<set>" } else { "<missing>" };
        f.debug_struct("Secrets")
            .field("salt_secret", &state(&self.salt_secret))
            .field("access_secret", &state(&self.access_secret))
            .field("refresh_secret", &state(&self.refresh_secret))
            .finish()
    }
}

impl Args {
    /// Snapshot the secrets for injection into the gate and token service
    pub fn secrets(&self) -> Secrets {
        Secrets {
            salt_secret: non_empty(&self.salt_secret),
            access_secret: non_empty(&self.jwt_access_secret),
            refresh_secret: non_empty(&self.jwt_refresh_secret),
        }
    }

    /// Token issuance/verification settings
    pub fn token_config(&self) -> TokenConfig {
        let secrets = self.secrets();
        TokenConfig {
            access_secret: secrets.access_secret.clone(),
            refresh_secret: secrets.refresh_secret.clone(),
            access_expiry_seconds: self.access_token_expiry_seconds,
            refresh_expiry_seconds: self.refresh_token_expiry_seconds,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let secrets = self.secrets();

        if !self.dev_mode {
            if secrets.salt_secret.is_none() {
                return Err("SALT_SECRET is required in production mode".to_string());
            }
            if secrets.access_secret.is_none() {
                return Err("JWT_ACCESS_SECRET is required in production mode".to_string());
            }
            if secrets.refresh_secret.is_none() {
                return Err("JWT_REFRESH_SECRET is required in production mode".to_string());
            }
        }

        if let (Some(access), Some(refresh)) = (&secrets.access_secret, &secrets.refresh_secret) {
            if access == refresh {
                return Err(
                    "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must be different".to_string(),
                );
            }
        }

        if self.access_token_expiry_seconds == 0 || self.refresh_token_expiry_seconds == 0 {
            return Err("Token expiry must be greater than zero".to_string());
        }

        if self.access_token_expiry_seconds > MAX_EXPIRY_SECONDS
            || self.refresh_token_expiry_seconds > MAX_EXPIRY_SECONDS
        {
            return Err(format!(
                "Token expiry must not exceed {} seconds",
                MAX_EXPIRY_SECONDS
            ));
        }

        if self.access_token_expiry_seconds >= self.refresh_token_expiry_seconds {
            return Err(
                "ACCESS_TOKEN_EXPIRY_SECONDS must be shorter than REFRESH_TOKEN_EXPIRY_SECONDS"
                    .to_string(),
            );
        }

        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from([
            "tsophen",
            "--salt-secret",
            "salt",
            "--jwt-access-secret",
            "access-secret",
            "--jwt-refresh-secret",
            "refresh-secret",
        ])
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.access_token_expiry_seconds, 300);
        assert_eq!(args.refresh_token_expiry_seconds, 30 * 24 * 60 * 60);
        assert_eq!(args.refresh_cookie_max_age_seconds, 7 * 24 * 60 * 60);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_rejected_in_production() {
        let mut args = base_args();
        args.salt_secret = None;
        assert!(args.validate().is_err());

        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_counts_as_missing() {
        let mut args = base_args();
        args.jwt_access_secret = Some(String::new());
        assert!(args.secrets().access_secret.is_none());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_shared_jwt_secret_rejected() {
        let mut args = base_args();
        args.jwt_refresh_secret = Some("access-secret".into());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_expiry_capped_at_one_year() {
        let mut args = base_args();
        args.refresh_token_expiry_seconds = u64::MAX;
        assert!(args.validate().is_err());

        args.refresh_token_expiry_seconds = MAX_EXPIRY_SECONDS;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let rendered = format!("{:?}", base_args().secrets());
        assert!(!rendered.contains("access-secret"));
        assert!(rendered.contains("<set>"));
    }
}
