//! Authentication route handlers
//!
//! `POST /login` trades a username/password pair for an access token.

use crate::auth::Credential;
use crate::error::{ApiResult, AppError, AuthError, INVALID_LOGIN_MESSAGE};
use crate::state::SharedState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Both fields are optional here so that an incomplete body is a 400, not a
/// deserialization failure. An explicit `null` counts as missing.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// POST /login
///
/// Authenticate with username and password, receive a JWT access token.
pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let credential = match payload {
        Ok(Json(LoginRequest {
            username: Some(username),
            password: Some(password),
        })) => Credential::new(username, password),
        Ok(_) => return Err(AuthError::MissingField.into_app_error(None, &state.realm)),
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable login body");
            return Err(AuthError::MissingField.into_app_error(None, &state.realm));
        }
    };

    let principal = state.basic.verify(credential).await.map_err(|_| AppError::Unauthorized {
        challenge: None,
        message: INVALID_LOGIN_MESSAGE,
    })?;

    let issued = state.tokens.issue(&principal.username, principal.role)?;
    info!(
        username = %principal.username,
        role = %principal.role,
        expires_at = %issued.expires_at,
        "Issued access token"
    );

    Ok(Json(LoginResponse {
        access_token: issued.access_token,
    }))
}
