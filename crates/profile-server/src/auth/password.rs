//! Password hashing built around Argon2id.
//!
//! Every account uses the same memory, iteration and parallelism parameters;
//! they are encoded into the PHC string so verification needs no extra state.

use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use thiserror::Error;

/// 19 MiB, 3 passes, 1 lane.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

fn argon2_config() -> Result<Argon2<'static>, argon2::password_hash::Error> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(argon2::password_hash::Error::from)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash `plaintext` and return the PHC string.
///
/// CPU- and memory-heavy; call from a blocking task.
///
/// # Errors
///
/// Returns [`PasswordError::Hash`] if the parameters are rejected or hashing
/// fails.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_config().map_err(|e| PasswordError::Hash(e.to_string()))?;
    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `plaintext` against a stored PHC string.
///
/// A malformed stored hash is treated as a mismatch.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    match argon2_config() {
        Ok(argon2) => argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Hash checked when the account does not exist, so that path costs the same
/// as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unknown-account-placeholder").ok());

/// Compute the dummy hash ahead of the first login. Blocking.
pub fn prepare_dummy_hash() {
    LazyLock::force(&DUMMY_HASH);
}

/// Spend one full verification on the dummy hash and discard the result.
/// Blocking.
pub fn verify_dummy(plaintext: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plaintext, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn salts_differ_per_hash() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn dummy_hash_uses_account_parameters() {
        prepare_dummy_hash();
        let hash = DUMMY_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=3,p=1$"));
        let real = hash_password("x").unwrap();
        assert_eq!(
            hash.split('$').nth(3),
            real.split('$').nth(3),
            "dummy and account hashes must cost the same"
        );
        assert!(verify_password("unknown-account-placeholder", hash));
        verify_dummy("anything");
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
