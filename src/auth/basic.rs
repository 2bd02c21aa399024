//! HTTP Basic authentication guard
//!
//! Decodes `Authorization: Basic <base64(username:password)>` and checks the
//! pair against the credential store. Unknown users and wrong passwords are
//! reported identically, and an unknown user still pays for one bcrypt
//! verification against a decoy hash.

use crate::auth::{hash_password, verify_password, PasswordError, Principal};
use crate::error::AuthError;
use crate::users::CredentialStore;
use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Hashed once at startup with the store's cost; matches no real account.
const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Username and plaintext password taken from a request.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Extract a Basic credential from the request headers.
///
/// A missing header is [`AuthError::MissingCredential`]; a header with another
/// scheme, bad base64 or no `:` is [`AuthError::MalformedCredential`]. The
/// password is everything after the first `:`.
pub fn parse_basic(headers: &HeaderMap) -> Result<Credential, AuthError> {
    match headers.typed_try_get::<Authorization<Basic>>() {
        Ok(Some(Authorization(basic))) => Ok(Credential::new(basic.username(), basic.password())),
        Ok(None) => Err(AuthError::MissingCredential),
        Err(_) => Err(AuthError::MalformedCredential),
    }
}

/// Verifies username/password pairs against the credential store.
#[derive(Clone)]
pub struct BasicAuthenticator {
    store: Arc<dyn CredentialStore>,
    decoy_hash: Arc<str>,
}

impl BasicAuthenticator {
    pub fn new(store: Arc<dyn CredentialStore>, cost: u32) -> Result<Self, PasswordError> {
        let decoy_hash = hash_password(DECOY_PASSWORD, cost)?;
        Ok(Self {
            store,
            decoy_hash: decoy_hash.into(),
        })
    }

    /// Check a credential and return the matching principal.
    pub async fn verify(&self, credential: Credential) -> Result<Principal, AuthError> {
        let (hash, principal) = match self.store.lookup(&credential.username) {
            Some(record) => (
                record.password_hash,
                Some(Principal::new(record.username, record.role)),
            ),
            None => (self.decoy_hash.to_string(), None),
        };

        let password = credential.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Password verification task failed");
                false
            });

        match (matches, principal) {
            (true, Some(principal)) => Ok(principal),
            _ => {
                debug!(username = %credential.username, "Rejected credentials");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Run the Basic guard over a request's headers.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let credential = parse_basic(headers)?;
        self.verify(credential).await
    }
}
