//! Authorization middleware
//!
//! Applied per route with `route_layer`, so each handler only ever runs after
//! its own policy allowed the request.

use crate::auth::{authorize, AuthDecision, Identity, RoutePolicy};
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// State for [`require_policy`]: the app plus the route's policy.
#[derive(Clone)]
pub struct PolicyState {
    pub app: SharedState,
    pub policy: RoutePolicy,
}

impl PolicyState {
    pub fn new(app: SharedState, policy: RoutePolicy) -> Self {
        Self { app, policy }
    }
}

/// Enforce the route's policy, exposing the caller to handlers on success.
///
/// An authenticated [`Principal`](crate::auth::Principal) is inserted into
/// request extensions; anonymous requests get nothing.
pub async fn require_policy(
    State(guard): State<PolicyState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match authorize(&guard.app, guard.policy, request.headers()).await {
        AuthDecision::Allow(identity) => {
            if let Identity::Authenticated(principal) = identity {
                request.extensions_mut().insert(principal);
            }

            Ok(next.run(request).await)
        }
        AuthDecision::Reject(reason) => {
            debug!(
                path = %request.uri().path(),
                reason = %reason,
                "Request rejected"
            );
            Err(reason.into_app_error(guard.policy.scheme(), &guard.app.realm))
        }
    }
}
