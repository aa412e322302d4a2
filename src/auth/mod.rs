//! Authentication and authorization
//!
//! - `password`: PBKDF2 vault key derivation and verification
//! - `jwt`: access and refresh token issuance and verification
//! - `permissions`: static role table
//! - `gate`: per-route authenticate/require pipeline

pub mod gate;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod validation;

pub use gate::{
    AuthorizationGate, GateInputs, GateStep, LoginBody, Pipeline, RequestIdentity, Strategy,
    REFRESH_COOKIE,
};
pub use jwt::{
    extract_bearer_token, extract_cookie, Claims, IssuedToken, TokenConfig, TokenKind,
    TokenService, VerificationFailure, MAX_EXPIRY_SECONDS,
};
pub use password::{derive_vault_key, validate_password_shape, verify_password};
pub use permissions::{Action, PermissionEntry, PermissionTable, Resource, Role};
pub use validation::{is_valid_email, is_valid_full_name};
