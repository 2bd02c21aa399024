//! Error handling module
//!
//! Two layers: [`AuthError`] is the precise reason a guard or the enforcer
//! refused a request, [`AppError`] is what actually goes on the wire. Every
//! credential and token failure collapses into the same 401 so that clients
//! cannot tell which check tripped; only an insufficient role is reported
//! separately as 403.

use crate::auth::{Role, Scheme};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Generic body for every guard-level 401.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Body for a login attempt with bad credentials.
pub const INVALID_LOGIN_MESSAGE: &str = "Invalid username or password";

/// Body for a login request without both fields.
pub const MISSING_FIELDS_MESSAGE: &str = "Missing username or password";

/// Reasons an authentication or authorization step failed.
///
/// These never reach the client verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,

    #[error("credential could not be decoded")]
    MalformedCredential,

    #[error("unknown user or wrong password")]
    InvalidCredentials,

    #[error("login body is missing a required field")]
    MissingField,

    #[error("token is not a well-formed JWT")]
    TokenMalformed,

    #[error("token signature does not verify")]
    TokenInvalidSignature,

    #[error("token has expired")]
    TokenExpired,

    #[error("requires {required} role, principal has {actual}")]
    InsufficientRole { required: Role, actual: Role },
}

impl AuthError {
    /// Convert into the externally visible error for a route guarded by
    /// `scheme`, challenging within `realm`. Without a scheme no
    /// `WWW-Authenticate` header is sent.
    pub fn into_app_error(self, scheme: Option<Scheme>, realm: &str) -> AppError {
        match self {
            AuthError::MissingField => AppError::BadRequest(MISSING_FIELDS_MESSAGE.to_string()),
            AuthError::InsufficientRole { required, .. } => {
                AppError::Forbidden(forbidden_message(required))
            }
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::InvalidCredentials
            | AuthError::TokenMalformed
            | AuthError::TokenInvalidSignature
            | AuthError::TokenExpired => AppError::Unauthorized {
                challenge: scheme.map(|scheme| scheme.challenge(realm)),
                message: UNAUTHORIZED_MESSAGE,
            },
        }
    }
}

fn forbidden_message(required: Role) -> String {
    match required {
        Role::Admin => "Admin access required".to_string(),
        Role::User => "Insufficient role".to_string(),
    }
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// `challenge` becomes the `WWW-Authenticate` header; `None` sends none.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        challenge: Option<String>,
        message: &'static str,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, challenge) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unauthorized { challenge, message } => {
                (StatusCode::UNAUTHORIZED, message.to_string(), challenge)
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();

        if let Some(challenge) = challenge {
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_token_failures_are_indistinguishable() {
        let mut seen = Vec::new();
        for err in [
            AuthError::MissingCredential,
            AuthError::TokenMalformed,
            AuthError::TokenInvalidSignature,
            AuthError::TokenExpired,
        ] {
            let response = err.into_app_error(Some(Scheme::Bearer), "test").into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let challenge = response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .cloned()
                .unwrap();
            seen.push((challenge, body_of(response).await));
        }

        assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(seen[0].1, r#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_insufficient_role_is_forbidden() {
        let err = AuthError::InsufficientRole {
            required: Role::Admin,
            actual: Role::User,
        };
        let response = err.into_app_error(Some(Scheme::Bearer), "test").into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        assert_eq!(body_of(response).await, r#"{"error":"Admin access required"}"#);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let response = AuthError::MissingField
            .into_app_error(Some(Scheme::Bearer), "test")
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_of(response).await,
            r#"{"error":"Missing username or password"}"#
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = AppError::Internal("bcrypt blew up".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, r#"{"error":"Internal server error"}"#);
    }
}
