//! Configuration loading and representation.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Configuration is loaded once at startup and passed explicitly.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use classifieds_auth::{AuthConfig, HashingParams};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 48;
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Credentials for an admin account created at startup if missing.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub auth: AuthConfig,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    /// Load from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let ttl_hours: i64 = parse_or(&get, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if ttl_hours <= 0 {
            return Err(invalid("TOKEN_TTL_HOURS", "must be positive"));
        }
        let token_ttl = Duration::try_hours(ttl_hours)
            .ok_or_else(|| invalid("TOKEN_TTL_HOURS", "out of range"))?;

        let defaults = HashingParams::default();
        let hashing = HashingParams {
            memory_kib: parse_or(&get, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&get, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&get, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let admin = match (get("ADMIN_USERNAME"), get("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            (None, None) => None,
            _ => {
                return Err(invalid(
                    "ADMIN_USERNAME",
                    "ADMIN_USERNAME and ADMIN_PASSWORD must be set together",
                ));
            }
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            auth: AuthConfig {
                secret: secret.into_bytes(),
                token_ttl,
                hashing,
            },
            admin,
        })
    }
}

fn invalid(key: &'static str, message: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.to_string(),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| invalid(key, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.database_url, None);
        assert_eq!(config.auth.token_ttl, Duration::hours(48));
        assert_eq!(config.auth.secret, DEV_JWT_SECRET.as_bytes());
        assert_eq!(config.auth.hashing, HashingParams::default());
        assert!(config.admin.is_none());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_HOURS", "2"),
            ("ARGON2_MEMORY_KIB", "4096"),
            ("DATABASE_URL", "postgres://localhost/ads"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "hunter2"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.auth.secret, b"s3cret");
        assert_eq!(config.auth.token_ttl, Duration::hours(2));
        assert_eq!(config.auth.hashing.memory_kib, 4096);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/ads"));
        assert_eq!(config.admin.unwrap().username, "root");
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = load(&[("TOKEN_TTL_HOURS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. }));

        let err = load(&[("TOKEN_TTL_HOURS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. }));
    }

    #[test]
    fn admin_credentials_come_in_pairs() {
        let err = load(&[("ADMIN_USERNAME", "root")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ADMIN_USERNAME", .. }));
    }

    #[test]
    fn admin_password_is_redacted() {
        let config = load(&[("ADMIN_USERNAME", "root"), ("ADMIN_PASSWORD", "hunter2")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
