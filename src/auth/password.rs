//! Vault key derivation and credential verification using PBKDF2
//!
//! The stored per-user "vault key" is PBKDF2-HMAC-SHA512 over the submitted
//! password, salted with the process-wide salt secret, 100,000 rounds,
//! 64 bytes of output, hex encoded.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::types::{Result, TsophenError};

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (hex encoding doubles it)
pub const DERIVED_KEY_LEN: usize = 64;

/// Upper bound on the submitted password, checked before any hashing
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Derive the hex-encoded vault key for a password.
///
/// Deterministic for a fixed (password, salt) pair. Deliberately slow: run
/// it on a blocking thread from async code.
pub fn derive_vault_key(password: &str, salt_secret: &str) -> Result<String> {
    if salt_secret.is_empty() {
        return Err(TsophenError::Misconfiguration("salt secret is empty".into()));
    }

    let mut derived = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        salt_secret.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut derived[..],
    );

    Ok(hex::encode(&derived[..]))
}

/// Verify a submitted password against a stored vault key.
///
/// Fails closed: a missing salt, a missing stored key or a derivation error
/// all return false. The final comparison is constant-time.
pub fn verify_password(
    password: &str,
    stored_vault_key: Option<&str>,
    salt_secret: Option<&str>,
) -> bool {
    let (Some(stored), Some(salt)) = (stored_vault_key, salt_secret) else {
        return false;
    };

    if stored.is_empty() {
        return false;
    }

    match derive_vault_key(password, salt) {
        Ok(derived) => {
            let derived = Zeroizing::new(derived);
            let (a, b) = (derived.as_bytes(), stored.as_bytes());
            a.len() == b.len() && bool::from(a.ct_eq(b))
        }
        Err(_) => false,
    }
}

/// Cheap syntactic check on a submitted password, run before any hashing.
pub fn validate_password_shape(password: &str) -> bool {
    !password.is_empty()
        && password.len() <= MAX_PASSWORD_LEN
        && !password.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &str = "test-salt-secret";

    #[test]
    fn test_derive_and_verify() {
        let password = "correct-horse-battery-staple";
        let key = derive_vault_key(password, SALT).unwrap();

        // 64 bytes, hex encoded
        assert_eq!(key.len(), DERIVED_KEY_LEN * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));

        assert!(verify_password(password, Some(&key), Some(SALT)));
        assert!(!verify_password("wrong-password", Some(&key), Some(SALT)));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_vault_key("same-password", SALT).unwrap();
        let b = derive_vault_key("same-password", SALT).unwrap();
        assert_eq!(a, b);

        let other_salt = derive_vault_key("same-password", "another-salt").unwrap();
        assert_ne!(a, other_salt);
    }

    #[test]
    fn test_fails_closed() {
        let key = derive_vault_key("pw", SALT).unwrap();

        assert!(!verify_password("pw", None, Some(SALT)));
        assert!(!verify_password("pw", Some(&key), None));
        assert!(!verify_password("pw", Some(""), Some(SALT)));
        assert!(!verify_password("pw", Some(&key), Some("")));
        assert!(!verify_password("pw", Some("not-hex-and-short"), Some(SALT)));
    }

    #[test]
    fn test_empty_salt_is_misconfiguration() {
        assert!(matches!(
            derive_vault_key("pw", ""),
            Err(TsophenError::Misconfiguration(_))
        ));
    }

    #[test]
    fn test_password_shape() {
        assert!(validate_password_shape("hunter2"));
        assert!(!validate_password_shape(""));
        assert!(!validate_password_shape("bad\u{0000}byte"));
        assert!(!validate_password_shape(&"a".repeat(MAX_PASSWORD_LEN + 1)));
    }
}
