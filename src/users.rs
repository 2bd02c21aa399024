//! Credential store
//!
//! Holds `username -> (password hash, role)`. The store is built once at
//! startup and never written afterwards, so lookups take no lock.

use crate::auth::{hash_password, PasswordError, Role};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use validator::Validate;

/// Usernames travel inside `username:password`, so no colons or whitespace.
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.@-]+$").expect("username pattern is valid"));

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read users file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse users file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid user {username:?}: {reason}")]
    Invalid { username: String, reason: String },

    #[error("Duplicate username {0:?}")]
    Duplicate(String),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Stored account
#[derive(Clone)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("username", &self.username)
            .field("password_hash", &"[redacted]")
            .field("role", &self.role)
            .finish()
    }
}

/// Account listing without the hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            role: record.role,
        }
    }
}

/// Read-only view of the accounts the guards authenticate against.
pub trait CredentialStore: Send + Sync {
    /// Find an account by exact username.
    fn lookup(&self, username: &str) -> Option<UserRecord>;

    /// All accounts, ordered by username.
    fn list(&self) -> Vec<UserSummary>;
}

/// Plaintext account definition, hashed before it enters the store
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SeedUser {
    #[validate(length(min = 1, max = 64, message = "Username must be between 1 and 64 characters"))]
    #[validate(regex(path = *USERNAME_RE, message = "Username may only contain letters, digits, '_', '.', '@' and '-'"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl SeedUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }
}

/// Accounts available when no users file is configured.
pub fn default_seed() -> Vec<SeedUser> {
    vec![
        SeedUser::new("user1", "password", Role::User),
        SeedUser::new("admin1", "password", Role::Admin),
    ]
}

/// Load seed accounts from a JSON array of `{username, password, role}`.
pub fn load_seed_file(path: &Path) -> Result<Vec<SeedUser>, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, UserRecord>,
}

impl InMemoryCredentialStore {
    /// Validate and hash every seed account.
    pub fn from_seed(seed: Vec<SeedUser>, cost: u32) -> Result<Self, StoreError> {
        let mut users = HashMap::with_capacity(seed.len());

        for user in seed {
            user.validate().map_err(|e| StoreError::Invalid {
                username: user.username.clone(),
                reason: e.to_string(),
            })?;

            if users.contains_key(&user.username) {
                return Err(StoreError::Duplicate(user.username));
            }

            let record = UserRecord {
                password_hash: hash_password(&user.password, cost)?,
                username: user.username.clone(),
                role: user.role,
            };
            users.insert(user.username, record);
        }

        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).cloned()
    }

    fn list(&self) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> = self.users.values().map(UserSummary::from).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}
