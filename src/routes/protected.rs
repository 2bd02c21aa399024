//! Plain-text resources behind each access policy
//!
//! Handlers here never check credentials themselves; the route's policy
//! layer has already done so by the time they run.

use crate::auth::Principal;
use axum::Extension;
use tracing::debug;

/// GET /
pub async fn home() -> &'static str {
    "Welcome to the Auth API!"
}

/// GET /status
pub async fn status() -> &'static str {
    "OK"
}

/// GET /basic-protected
pub async fn basic_protected(Extension(principal): Extension<Principal>) -> &'static str {
    debug!(username = %principal.username, "Basic-protected resource served");
    "Basic Auth: Access Granted"
}

/// GET /jwt-protected
pub async fn jwt_protected(Extension(principal): Extension<Principal>) -> &'static str {
    debug!(username = %principal.username, "JWT-protected resource served");
    "JWT Auth: Access Granted"
}

/// GET /admin-only
pub async fn admin_only(Extension(principal): Extension<Principal>) -> &'static str {
    debug!(username = %principal.username, "Admin resource served");
    "Admin Access: Granted"
}
