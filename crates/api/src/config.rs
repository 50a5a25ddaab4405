//! Process configuration read from the environment.
//!
//! The binary loads a `.env` file from the working directory first when
//! present; real environment variables always win over it.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 1325;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "employees";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set when STORAGE_BACKEND={backend}")]
    Missing { var: &'static str, backend: &'static str },
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which backend serves requests for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
    Redis,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Postgres => "postgres",
            StorageBackend::Redis => "redis",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "redis" => Ok(StorageBackend::Redis),
            other => Err(format!("unknown backend {other:?} (expected memory, postgres or redis)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: StorageBackend,
    /// Required when `backend` is `Postgres`.
    pub database_url: Option<String>,
    pub redis_url: String,
    pub redis_key_prefix: String,
    pub port: u16,
    pub store_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: None,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            redis_key_prefix: DEFAULT_REDIS_KEY_PREFIX.to_string(),
            port: DEFAULT_PORT,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Read the process environment. `main` loads `.env` beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backend = match get("STORAGE_BACKEND") {
            Some(raw) => raw.parse::<StorageBackend>().map_err(|reason| ConfigError::Invalid {
                var: "STORAGE_BACKEND",
                value: raw,
                reason,
            })?,
            None => defaults.backend,
        };

        let database_url = get("DATABASE_URL");
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing {
                var: "DATABASE_URL",
                backend: backend.as_str(),
            });
        }

        let port = match get("PORT") {
            Some(raw) => parse_number::<u16>("PORT", raw)?,
            None => defaults.port,
        };

        let store_timeout = match get("STORE_TIMEOUT_SECS") {
            Some(raw) => match parse_number::<u64>("STORE_TIMEOUT_SECS", raw.clone())? {
                0 => {
                    return Err(ConfigError::Invalid {
                        var: "STORE_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                secs => Duration::from_secs(secs),
            },
            None => defaults.store_timeout,
        };

        Ok(Self {
            backend,
            database_url,
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            redis_key_prefix: get("REDIS_KEY_PREFIX").unwrap_or(defaults.redis_key_prefix),
            port,
            store_timeout,
        })
    }
}

fn parse_number<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value: raw,
    })
}
