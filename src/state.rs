//! Application state management
//!
//! Everything here is built once at startup and only read afterwards.

use crate::auth::{BasicAuthenticator, PasswordError, TokenService};
use crate::config::AuthConfig;
use crate::users::CredentialStore;
use chrono::Duration;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Basic guard and login verifier over the credential store
    pub basic: BasicAuthenticator,

    /// JWT issuer and verifier
    pub tokens: TokenService,

    /// Realm named in `WWW-Authenticate` challenges
    pub realm: String,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, auth: &AuthConfig) -> Result<Self, PasswordError> {
        Ok(Self {
            basic: BasicAuthenticator::new(store, auth.bcrypt_cost)?,
            tokens: TokenService::new(
                auth.jwt_secret.as_bytes(),
                Duration::seconds(auth.token_ttl_secs),
                auth.leeway_secs,
            ),
            realm: auth.realm.clone(),
        })
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
