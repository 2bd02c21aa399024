//! Password hashing and verification
//!
//! Uses bcrypt for secure password hashing. bcrypt salts every hash and
//! compares digests in constant time.

use bcrypt::{hash, verify};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Hash a password using bcrypt
///
/// Only called while populating the credential store, never per request.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(hash(password, cost)?)
}

/// Verify a password against a stored hash
///
/// A stored hash bcrypt cannot parse counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match verify(password, stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            error!(error = %e, "Stored password hash could not be checked");
            false
        }
    }
}
