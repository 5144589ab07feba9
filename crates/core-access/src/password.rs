//! Password policy, email format checks and Argon2id hashing.

use crate::CoreAccessError;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

/// Characters a password may contain: ASCII letters, digits and the accepted specials.
static PASSWORD_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\d@$!%*?&]{8,}$").expect("valid password regex"));
static EMAIL_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const PASSWORD_POLICY_MESSAGE: &str = "Password must be at least 8 characters with uppercase, lowercase, number, and special character.";

const SPECIAL_CHARACTERS: &str = "@$!%*?&";

/// At least 8 characters with an uppercase letter, a lowercase letter, a digit
/// and one of `@$!%*?&`, drawn only from those classes.
pub fn is_strong_password(password: &str) -> bool {
    PASSWORD_CHARSET.is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIAL_CHARACTERS.contains(c))
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_FORMAT.is_match(email)
}

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, CoreAccessError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CoreAccessError::Crypto(format!("salt encoding: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreAccessError::Crypto(format!("hashing failed: {e}")))
}

/// A real Argon2id hash nobody can log in with, built on first use.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("zygote-unmatched-credential").ok());

/// Spends the same verification work as a real check and discards the result.
/// Used when no account matches, so both failure paths take equally long.
pub fn verify_against_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Returns `Ok(false)` on mismatch and an error only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CoreAccessError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CoreAccessError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreAccessError::Crypto(format!("verify error: {e}"))),
    }
}
