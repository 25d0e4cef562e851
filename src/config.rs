//! Environment-driven configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Main configuration for the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub health: HealthConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            http: HttpConfig::from_env()?,
            health: HealthConfig::from_env()?,
        })
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub pool_size: usize,
    /// Upper bound on a single store operation, pool checkout included.
    pub timeout: Duration,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = optional_env("DATABASE_URL")?.ok_or_else(|| ConfigError::MissingRequired {
            key: "DATABASE_URL".to_string(),
            hint: "Set DATABASE_URL or add it to .env".to_string(),
        })?;

        let pool_size = parse_optional_env("DATABASE_POOL_SIZE", 10)?;

        let timeout_secs: u64 = parse_optional_env("DATABASE_TIMEOUT_SECS", 5)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            url: SecretString::from(url),
            pool_size,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Get the database URL (exposes the secret).
    pub fn url(&self) -> &str {
        self.url.expose_secret()
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("HTTP_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_optional_env("HTTP_PORT", 3000)?,
        })
    }

    /// Resolve the configured bind address.
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "HTTP_HOST".to_string(),
                message: format!("{e}"),
            })
    }
}

/// Health check settings.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Average error rate (fraction in [0, 1]) above which the service
    /// reports itself down.
    pub error_rate_threshold: f64,
    /// Release version echoed in health reports.
    pub release_version: String,
}

impl HealthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let error_rate_threshold = parse_optional_env("ERROR_RATE_THRESHOLD", 0.5)?;
        validate_threshold("ERROR_RATE_THRESHOLD", error_rate_threshold)?;

        let release_version = optional_env("SERVER_RELEASE_VERSION")?
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        Ok(Self {
            error_rate_threshold,
            release_version,
        })
    }
}

fn validate_threshold(key: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be a fraction between 0 and 1, got {value}"),
        });
    }
    Ok(())
}

/// Read an environment variable, treating empty values as unset.
fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "not valid unicode".to_string(),
        }),
    }
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key)? {
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
        None => Ok(default),
    }
}
