//! One-way credential hashing. Plaintext never leaves this module's
//! arguments and is never persisted or logged.

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;

use super::errors::AuthError;

/// Hash a plaintext credential with a per-hash random salt.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .to_string();
    Ok(digest)
}

/// Compare a plaintext candidate against a stored digest. A malformed digest
/// is a `Hash` error, not a mismatch.
pub fn verify_password(plain: &str, digest: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(digest).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok())
}
