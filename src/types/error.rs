//! Error types for Tsophen
//!
//! Every failure that reaches the HTTP boundary is one of these variants.
//! The client only ever sees `public_message()`, never the inner detail.

use hyper::StatusCode;

/// Generic text for every authentication failure, whatever the cause
pub const AUTHENTICATION_FAILED: &str = "Authentication failed";

/// Generic text for server-side faults
pub const INTERNAL_SERVER_ERROR: &str =
    "An internal error with the server has occured. Please contact an administrator :)";

/// Main error type for Tsophen operations
#[derive(Debug, thiserror::Error)]
pub enum TsophenError {
    /// Missing or syntactically invalid input (user-correctable)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Wrong password, unknown account or an invalid token.
    /// The inner text is for logs only.
    #[error("Credential mismatch: {0}")]
    CredentialMismatch(String),

    /// A required server secret is absent (operator-correctable)
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Authenticated, but the role level is too low or the action is unknown
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TsophenError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedInput(_) => StatusCode::BAD_REQUEST,
            Self::CredentialMismatch(_) => StatusCode::FORBIDDEN,
            Self::Misconfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client.
    ///
    /// Input errors echo their reason since the caller can fix them.
    /// Everything else collapses to a fixed text.
    pub fn public_message(&self) -> String {
        match self {
            Self::MalformedInput(msg) | Self::NotFound(msg) | Self::Conflict(msg) => msg.clone(),
            Self::CredentialMismatch(_) => AUTHENTICATION_FAILED.to_string(),
            Self::PermissionDenied(_) => "You don't have enough permissions to do that. If you believe this is a mistake, please contact an administrator :)".to_string(),
            Self::Misconfiguration(_) | Self::Internal(_) => INTERNAL_SERVER_ERROR.to_string(),
            Self::Database(_) => {
                "An internal error with MongoDB has occured. Please contact an administrator :)"
                    .to_string()
            }
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        (self.status_code(), self.public_message())
    }
}

impl From<std::io::Error> for TsophenError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TsophenError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for TsophenError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for TsophenError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for TsophenError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON serialization failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for TsophenError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Background task failed: {}", err))
    }
}

/// Result type alias for Tsophen operations
pub type Result<T> = std::result::Result<T, TsophenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            TsophenError::MalformedInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TsophenError::CredentialMismatch("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TsophenError::PermissionDenied("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TsophenError::Misconfiguration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_misconfiguration_hides_secret_name() {
        let err = TsophenError::Misconfiguration("SALT_SECRET is not set".into());
        let (status, body) = err.into_status_code_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("SALT_SECRET"));
    }

    #[test]
    fn test_credential_mismatch_is_uniform() {
        let unknown_user = TsophenError::CredentialMismatch("no user for email".into());
        let wrong_password = TsophenError::CredentialMismatch("derived key differs".into());
        assert_eq!(unknown_user.public_message(), wrong_password.public_message());
    }
}
