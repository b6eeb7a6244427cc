//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// How long a request waits for a pooled connection
    pub database_acquire_timeout: Duration,

    /// Symmetric secret used to sign access tokens
    pub secret_key: String,

    /// Lifetime of an issued access token
    pub access_token_ttl: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Explicit log format choice; `None` defers to the environment
    pub log_json: Option<bool>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => compose_database_url(&lookup)?,
        };

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let acquire_secs: u64 = parse_or(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?;

        let secret_key = lookup("SECRET_KEY").ok_or(ConfigError::MissingEnv("SECRET_KEY"))?;
        if secret_key.is_empty() {
            return Err(ConfigError::InvalidValue("SECRET_KEY"));
        }

        let ttl_minutes: u64 = parse_or(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        if ttl_minutes == 0 {
            return Err(ConfigError::InvalidValue("ACCESS_TOKEN_EXPIRE_MINUTES"));
        }

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = parse_or(&lookup, "PORT", 3000)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let log_json = lookup("LOG_FORMAT").map(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            database_max_connections,
            database_acquire_timeout: Duration::from_secs(acquire_secs),
            secret_key,
            access_token_ttl: Duration::from_secs(ttl_minutes * 60),
            host,
            port,
            environment,
            log_json,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// JSON logs when `LOG_FORMAT=json`, or by default in production
    pub fn json_logs(&self) -> bool {
        self.log_json.unwrap_or_else(|| self.is_production())
    }
}

/// Build a postgres URL from the discrete SQL_* / POSTGRES_* variables.
fn compose_database_url<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingEnv(name));

    let host = lookup("SQL_HOST").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;
    let port: u16 = required("SQL_PORT")?
        .parse()
        .map_err(|_| ConfigError::InvalidValue("SQL_PORT"))?;
    let user = required("POSTGRES_USER")?;
    let password = required("POSTGRES_PASSWORD")?;
    let db = required("POSTGRES_DB")?;

    Ok(format!("postgres://{}:{}@{}:{}/{}", user, password, host, port, db))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(name)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
