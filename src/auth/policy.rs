//! Access policy enforcement
//!
//! Each route declares one [`RoutePolicy`]: which guard it trusts and what it
//! requires of the resulting principal. [`enforce`] is the single place where
//! a guard outcome becomes an allow/reject decision.

use crate::auth::{Principal, Role, Scheme};
use crate::error::AuthError;
use crate::state::AppState;
use axum::http::HeaderMap;

/// What a route requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, authenticated or not
    Public,
    /// Any principal the route's guard accepts
    AuthenticatedAny,
    /// A principal holding exactly this role
    AuthenticatedRole(Role),
}

/// A route's guard and requirement. Non-public routes trust exactly one scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    scheme: Option<Scheme>,
    requirement: Requirement,
}

impl RoutePolicy {
    pub const fn public() -> Self {
        Self {
            scheme: None,
            requirement: Requirement::Public,
        }
    }

    pub const fn basic(requirement: Requirement) -> Self {
        Self {
            scheme: Some(Scheme::Basic),
            requirement,
        }
    }

    pub const fn bearer(requirement: Requirement) -> Self {
        Self {
            scheme: Some(Scheme::Bearer),
            requirement,
        }
    }

    pub fn scheme(&self) -> Option<Scheme> {
        self.scheme
    }
}

/// Who a request was allowed through as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(Principal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow(Identity),
    Reject(AuthError),
}

/// Decide a request from the outcome of the route's guard.
///
/// `guard_result` is `None` when no guard ran.
pub fn enforce(
    requirement: Requirement,
    guard_result: Option<Result<Principal, AuthError>>,
) -> AuthDecision {
    let principal = match (requirement, guard_result) {
        (Requirement::Public, _) => return AuthDecision::Allow(Identity::Anonymous),
        (_, None) => return AuthDecision::Reject(AuthError::MissingCredential),
        (_, Some(Err(reason))) => return AuthDecision::Reject(reason),
        (_, Some(Ok(principal))) => principal,
    };

    match requirement {
        Requirement::AuthenticatedRole(required) if principal.role != required => {
            AuthDecision::Reject(AuthError::InsufficientRole {
                required,
                actual: principal.role,
            })
        }
        _ => AuthDecision::Allow(Identity::Authenticated(principal)),
    }
}

/// Run the policy's guard, and only that guard, then enforce.
pub async fn authorize(state: &AppState, policy: RoutePolicy, headers: &HeaderMap) -> AuthDecision {
    let guard_result = match (policy.requirement, policy.scheme) {
        (Requirement::Public, _) | (_, None) => None,
        (_, Some(Scheme::Basic)) => Some(state.basic.authenticate(headers).await),
        (_, Some(Scheme::Bearer)) => Some(state.tokens.authenticate(headers)),
    };

    enforce(policy.requirement, guard_result)
}
