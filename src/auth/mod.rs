//! Authentication and authorization module
//!
//! Provides HTTP Basic and JWT bearer authentication plus role-based access
//! control. Every route is bound to one [`RoutePolicy`]; the
//! [`require_policy`] middleware runs that policy's guard and nothing else.

mod basic;
mod jwt;
mod middleware;
mod password;
mod policy;

pub use basic::{BasicAuthenticator, Credential};
pub use jwt::{Claims, TokenService};
pub use middleware::{require_policy, PolicyState};
pub use password::{hash_password, verify_password, PasswordError};
pub use policy::{authorize, AuthDecision, Identity, Requirement, RoutePolicy};

use serde::{Deserialize, Serialize};

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account; may reach any authenticated route
    User,
    /// May additionally reach admin-only routes
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Credential scheme a route is guarded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `Authorization: Basic <base64(username:password)>`
    Basic,
    /// `Authorization: Bearer <jwt>`
    Bearer,
}

impl Scheme {
    /// `WWW-Authenticate` challenge value (RFC 7617 / RFC 6750).
    pub fn challenge(&self, realm: &str) -> String {
        let realm = realm.replace('\\', "\\\\").replace('"', "\\\"");
        match self {
            Scheme::Basic => format!("Basic realm=\"{}\", charset=\"UTF-8\"", realm),
            Scheme::Bearer => format!("Bearer realm=\"{}\"", realm),
        }
    }
}

/// The authenticated identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}
