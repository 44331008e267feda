//! Configuration module for environment variables and application settings

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use argon2::Params;

use crate::database::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub http_addr: SocketAddr,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token signing and lifetime settings
    pub auth: AuthConfig,

    /// Password hashing cost
    pub password: PasswordConfig,

    /// Allowed CORS origins, `None` means any origin
    pub cors_origins: Option<Vec<String>>,

    /// Admin account created at startup, if configured
    pub admin: Option<AdminSeed>,
}

/// Longest accepted token lifetime
const MAX_TOKEN_TIMEOUT_SECS: i64 = 30 * 24 * 60 * 60;
/// Longest accepted renewal window
const MAX_REFRESH_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub realm: String,
    /// Lifetime of an issued token, in seconds
    pub timeout_secs: i64,
    /// Window after the original signin during which a token may be renewed
    pub max_refresh_secs: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("realm", &self.realm)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_refresh_secs", &self.max_refresh_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} environment variable is required", key))
        };

        let http_addr = required("HTTP_ADDR")?;
        let http_addr = http_addr
            .parse()
            .with_context(|| format!("HTTP_ADDR is not a valid socket address: {}", http_addr))?;

        let database = DatabaseConfig {
            host: required("POSTGRES_HOST")?,
            port: parse_or(&lookup, "POSTGRES_PORT", 5432)?,
            user: required("POSTGRES_USER")?,
            password: required("POSTGRES_PASSWORD")?,
            dbname: required("POSTGRES_DB")?,
            max_size: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 16)?,
        };

        let auth = AuthConfig {
            secret: required("JWT_SECRET")?,
            realm: lookup("JWT_REALM").unwrap_or_else(|| "garden.io".to_string()),
            timeout_secs: parse_seconds(&lookup, "JWT_TIMEOUT_SECS", 15, MAX_TOKEN_TIMEOUT_SECS)?,
            max_refresh_secs: parse_seconds(
                &lookup,
                "JWT_MAX_REFRESH_SECS",
                3600,
                MAX_REFRESH_WINDOW_SECS,
            )?,
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or(&lookup, "PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        };

        let cors_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            None => None,
            Some(raw) if raw.trim() == "*" => None,
            Some(raw) => Some(
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
            ),
        };

        let admin = lookup("ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .map(|password| AdminSeed {
                username: lookup("ADMIN_USERNAME")
                    .unwrap_or_else(|| "admin@test.com".to_string()),
                password,
            });

        Ok(Self {
            http_addr,
            database,
            auth,
            password,
            cors_origins,
            admin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

/// Parse a positive number of seconds no larger than `max`
fn parse_seconds<F>(lookup: &F, key: &str, default: i64, max: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default)?;
    if secs <= 0 || secs > max {
        bail!("{} must be between 1 and {} seconds, got {}", key, max, secs);
    }
    Ok(secs)
}
