//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Used when `JWT_SECRET` is unset. Development only.
const DEV_JWT_SECRET: &str = "gatekeeper-dev-secret-change-in-production";

const MIN_SECRET_LEN: usize = 32;

/// Longest access-token lifetime accepted from `JWT_TTL_SECS` (30 days).
const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Largest clock skew accepted from `JWT_LEEWAY_SECS`.
const MAX_LEEWAY_SECS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Failed to parse {var}: {value:?}")]
    ParseError { var: &'static str, value: String },
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 5000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub leeway_secs: u64,
    pub realm: String,
    pub bcrypt_cost: u32,
    pub users_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_secs: 15 * 60,
            leeway_secs: 0,
            realm: "Authentication Required".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            users_file: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[redacted]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("realm", &self.realm)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("users_file", &self.users_file)
            .finish()
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, a broken one is not
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from any variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: parse_var(&get, "HOST", server_defaults.host)?,
            port: parse_var(&get, "PORT", server_defaults.port)?,
        };

        let cors = CorsConfig {
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        let auth_defaults = AuthConfig::default();
        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) if secret.is_empty() => {
                return Err(ConfigError::InvalidValue("JWT_SECRET is empty".to_string()));
            }
            Some(secret) => {
                if secret.len() < MIN_SECRET_LEN {
                    warn!(
                        "JWT_SECRET is shorter than the recommended {} bytes",
                        MIN_SECRET_LEN
                    );
                }
                secret
            }
            None => {
                warn!("JWT_SECRET not set, using default (INSECURE - set in production!)");
                auth_defaults.jwt_secret
            }
        };

        let token_ttl_secs = parse_var(&get, "JWT_TTL_SECS", auth_defaults.token_ttl_secs)?;
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&token_ttl_secs) {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_TTL_SECS must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            )));
        }

        let leeway_secs = parse_var(&get, "JWT_LEEWAY_SECS", auth_defaults.leeway_secs)?;
        if leeway_secs > MAX_LEEWAY_SECS {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_LEEWAY_SECS must be at most {}",
                MAX_LEEWAY_SECS
            )));
        }

        let bcrypt_cost = parse_var(&get, "BCRYPT_COST", auth_defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(
                "BCRYPT_COST must be between 4 and 31".to_string(),
            ));
        }

        let auth = AuthConfig {
            jwt_secret,
            token_ttl_secs,
            leeway_secs,
            realm: get("AUTH_REALM").unwrap_or(auth_defaults.realm),
            bcrypt_cost,
            users_file: get("USERS_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
        };

        Ok(Self { server, cors, auth })
    }
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::ParseError { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_defaults_without_env() {
        let settings = settings_from(&[]).unwrap();

        assert_eq!(settings.auth.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(settings.auth.token_ttl_secs, 900);
        assert_eq!(settings.auth.leeway_secs, 0);
        assert_eq!(settings.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(settings.auth.users_file.is_none());
        assert!(settings.cors.allowed_origins.is_empty());
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("JWT_TTL_SECS", "60"),
            ("AUTH_REALM", "internal"),
            ("USERS_FILE", "/etc/gatekeeper/users.json"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();

        assert_eq!(settings.server.host, Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.auth.token_ttl_secs, 60);
        assert_eq!(settings.auth.realm, "internal");
        assert_eq!(
            settings.auth.users_file,
            Some(PathBuf::from("/etc/gatekeeper/users.json"))
        );
        assert_eq!(
            settings.cors.allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_empty_secret_is_fatal() {
        assert!(matches!(
            settings_from(&[("JWT_SECRET", "")]),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_bad_numbers_are_fatal() {
        assert!(matches!(
            settings_from(&[("PORT", "eighty")]),
            Err(ConfigError::ParseError { var: "PORT", .. })
        ));
        assert!(matches!(
            settings_from(&[("JWT_TTL_SECS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            settings_from(&[("BCRYPT_COST", "40")]),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_token_lifetimes_are_bounded() {
        assert!(matches!(
            settings_from(&[("JWT_TTL_SECS", "9000000000000")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            settings_from(&[("JWT_LEEWAY_SECS", "18446744073709551615")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            settings_from(&[("JWT_LEEWAY_SECS", "301")]),
            Err(ConfigError::InvalidValue(_))
        ));

        let settings = settings_from(&[
            ("JWT_TTL_SECS", "2592000"),
            ("JWT_LEEWAY_SECS", "300"),
        ])
        .unwrap();
        assert_eq!(settings.auth.token_ttl_secs, 2_592_000);
        assert_eq!(settings.auth.leeway_secs, 300);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = settings_from(&[("JWT_SECRET", "super-secret-value-nobody-should-see")])
            .unwrap();
        let rendered = format!("{:?}", settings);

        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("[redacted]"));
    }
}
