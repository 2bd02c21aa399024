//! JWT token management
//!
//! Issues and verifies HS256 access tokens. Tokens are stateless: nothing is
//! recorded server-side after issuance, so a token stays valid until its
//! `exp` no matter what happens to the account afterwards.

use crate::auth::{Principal, Role};
use crate::error::{AppError, AuthError};
use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// User role
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not valid before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: Uuid,
    /// Token type
    pub token_type: TokenType,
}

/// Only access tokens exist; any other `token_type` fails to decode.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
}

impl Claims {
    /// Access-token claims for `username`, valid from `now` for `ttl`.
    pub fn access(
        username: &str,
        role: Role,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, AppError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        Ok(Self {
            sub: username.to_string(),
            role,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        })
    }
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens with the server secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = leeway_secs;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Create an access token for a user whose password was just verified.
    pub fn issue(&self, username: &str, role: Role) -> Result<IssuedToken, AppError> {
        let claims = Claims::access(username, role, Utc::now(), self.ttl)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        Ok(IssuedToken {
            access_token: self.encode(&claims)?,
            expires_at,
        })
    }

    /// Sign an arbitrary claim set.
    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))
    }

    /// Decode and validate a token: structure, then signature, then expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => AuthError::TokenInvalidSignature,
                // outside the validity window either way
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
                    AuthError::TokenExpired
                }
                _ => AuthError::TokenMalformed,
            };
            debug!(error = %e, reason = %reason, "Token rejected");
            reason
        })?;

        Ok(data.claims)
    }

    /// Run the bearer guard over a request's headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = match headers.typed_try_get::<Authorization<Bearer>>() {
            Ok(Some(Authorization(bearer))) => bearer,
            Ok(None) => return Err(AuthError::MissingCredential),
            Err(_) => return Err(AuthError::TokenMalformed),
        };

        self.verify(token.token()).map(Principal::from)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &ALGORITHM)
            .field("ttl_secs", &self.ttl.num_seconds())
            .field("leeway_secs", &self.validation.leeway)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &[u8] = b"test-secret-key-that-is-long-enough-for-testing";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::minutes(15), 0)
    }

    #[test]
    fn test_issue_and_verify_admin() {
        let tokens = service();

        let issued = tokens.issue("admin1", Role::Admin).unwrap();
        let claims = tokens.verify(&issued.access_token).unwrap();

        assert_eq!(claims.sub, "admin1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_round_trip() {
        let tokens = service();

        for (username, role) in [
            ("user1", Role::User),
            ("admin1", Role::Admin),
            ("someone.else@example.com", Role::User),
        ] {
            let issued = tokens.issue(username, role).unwrap();
            let claims = tokens.verify(&issued.access_token).unwrap();
            assert_eq!((claims.sub.as_str(), claims.role), (username, role));
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = service();

        let first = tokens.issue("user1", Role::User).unwrap();
        let second = tokens.issue("user1", Role::User).unwrap();
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn test_expired_token() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::hours(2);
        let claims = Claims::access("user1", Role::User, issued_at, Duration::hours(1)).unwrap();
        let token = tokens.encode(&claims).unwrap();

        assert_eq!(tokens.verify(&token).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let tokens = TokenService::new(SECRET, Duration::days(365 * 1_000_000), 0);

        let err = tokens.issue("user1", Role::User).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let tokens = TokenService::new(SECRET, Duration::minutes(15), 120);
        let issued_at = Utc::now() - Duration::seconds(70);
        let claims = Claims::access("user1", Role::User, issued_at, Duration::seconds(10)).unwrap();
        let token = tokens.encode(&claims).unwrap();

        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn test_flipped_signature_byte() {
        let tokens = service();
        let token = tokens.issue("user1", Role::User).unwrap().access_token;

        let (signed_part, signature) = token.rsplit_once('.').unwrap();
        let mut signature: Vec<char> = signature.chars().collect();
        signature[0] = if signature[0] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{}.{}", signed_part, signature.into_iter().collect::<String>());

        assert_eq!(
            tokens.verify(&tampered).unwrap_err(),
            AuthError::TokenInvalidSignature
        );
    }

    #[test]
    fn test_tampered_claims() {
        let tokens = service();
        let user_token = tokens.issue("user1", Role::User).unwrap().access_token;
        let admin_token = tokens.issue("admin1", Role::Admin).unwrap().access_token;

        // user1's header and signature around admin1's payload
        let user_parts: Vec<&str> = user_token.split('.').collect();
        let admin_parts: Vec<&str> = admin_token.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);

        assert_eq!(
            tokens.verify(&forged).unwrap_err(),
            AuthError::TokenInvalidSignature
        );
    }

    #[test]
    fn test_wrong_secret() {
        let other = TokenService::new(b"another-secret-used-by-someone-else", Duration::minutes(15), 0);
        let token = other.issue("admin1", Role::Admin).unwrap().access_token;

        assert_eq!(
            service().verify(&token).unwrap_err(),
            AuthError::TokenInvalidSignature
        );
    }

    #[test]
    fn test_unsigned_token() {
        let tokens = service();
        let token = tokens.issue("admin1", Role::Admin).unwrap().access_token;
        let payload = token.split('.').nth(1).unwrap();

        // {"alg":"none","typ":"JWT"}
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{}.", payload);
        assert_eq!(tokens.verify(&unsigned).unwrap_err(), AuthError::TokenMalformed);
    }

    #[test]
    fn test_authenticate_headers() {
        use axum::http::{header, HeaderValue};

        let tokens = service();
        let token = tokens.issue("user1", Role::User).unwrap().access_token;

        let mut headers = HeaderMap::new();
        assert_eq!(
            tokens.authenticate(&headers).unwrap_err(),
            AuthError::MissingCredential
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjE6cGFzc3dvcmQ="),
        );
        assert_eq!(
            tokens.authenticate(&headers).unwrap_err(),
            AuthError::TokenMalformed
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(
            tokens.authenticate(&headers).unwrap(),
            Principal::new("user1", Role::User)
        );
    }

    #[test]
    fn test_garbage_tokens() {
        let tokens = service();

        for garbage in ["", "not-a-token", "a.b", "a.b.c", "invalid.token.here"] {
            assert_eq!(
                tokens.verify(garbage).unwrap_err(),
                AuthError::TokenMalformed,
                "{garbage:?}"
            );
        }
    }
}
