//! Password hashing with Argon2id.

use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};

/// Hash a plaintext password into a PHC string with a fresh random salt.
///
/// Length limits are enforced by request validation, not here.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

/// Check a plaintext password against a stored hash.
///
/// A malformed hash counts as a mismatch.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

// Stand-in hash for logins against an unknown email.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unused-placeholder-password").ok());

/// Run a full verification that can never succeed, so rejecting an unknown
/// account costs the same as rejecting a wrong password.
pub fn verify_against_dummy(plaintext: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plaintext, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_the_correct_password() {
        let hash = hash_password("SuperSecret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("SuperSecret123", &hash));
    }

    #[test]
    fn rejects_a_different_password() {
        let hash = hash_password("SuperSecret123").unwrap();
        assert!(!verify_password("SuperSecret124", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn same_input_gets_a_different_salt() {
        let a = hash_password("SuperSecret123").unwrap();
        let b = hash_password("SuperSecret123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("SuperSecret123", &a));
        assert!(verify_password("SuperSecret123", &b));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("SuperSecret123", "not-a-phc-string"));
        assert!(!verify_password("SuperSecret123", ""));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(PasswordHash::new(hash).is_ok());
        assert!(verify_password("unused-placeholder-password", hash));

        verify_against_dummy("SuperSecret123");
    }
}
