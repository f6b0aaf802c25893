use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

/// Longest accepted password, in bytes. Longer input is refused, never truncated.
pub const MAX_PASSWORD_BYTES: usize = 256;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password exceeds {} bytes", MAX_PASSWORD_BYTES)]
    InputTooLong,

    #[error("stored password digest is malformed: {0}")]
    InvalidDigestFormat(String),

    #[error("argon2 hashing failed: {0}")]
    Hashing(String),
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::InputTooLong);
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// A mismatch is `Ok(false)`; only an unparseable digest is an error.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::InvalidDigestFormat(e.to_string())
    })?;
    if plain.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
