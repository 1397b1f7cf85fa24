//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::{auth::MAX_WINDOW_SECONDS, cache::DEFAULT_CAPACITY, operation::PaginationSettings};

/// Longest accepted credential cache entry lifetime (one year).
pub const MAX_CACHE_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Configuration that could not be loaded or is out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{name} must be between {min} and {max}")]
    OutOfRange { name: &'static str, min: u64, max: u64 },
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `AUTH_WINDOW_SECONDS` (optional): accepted clock skew for signed requests, defaults to 30, at most one day
/// - `CREDENTIAL_CACHE_TTL_SECONDS` (optional): cache entry lifetime; unset means entries never expire
/// - `CREDENTIAL_CACHE_MAX_CAPACITY` (optional): most entries the cache holds, absences included, defaults to 10000
/// - `CREDENTIAL_CACHE_PRELOAD` (optional): load every active credential into the cache at startup
/// - `PAGINATION_DEFAULT_LIMIT` / `PAGINATION_DEFAULT_OFFSET` / `PAGINATION_MAX_LIMIT` (optional)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_auth_window")]
    pub auth_window_seconds: i64,

    #[serde(default)]
    pub credential_cache_ttl_seconds: Option<u64>,

    #[serde(default = "default_cache_capacity")]
    pub credential_cache_max_capacity: u64,

    #[serde(default)]
    pub credential_cache_preload: bool,

    #[serde(default = "default_limit")]
    pub pagination_default_limit: i64,

    #[serde(default)]
    pub pagination_default_offset: i64,

    #[serde(default = "default_max_limit")]
    pub pagination_max_limit: i64,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_auth_window() -> i64 {
    30
}

fn default_cache_capacity() -> u64 {
    DEFAULT_CAPACITY
}

fn default_limit() -> i64 {
    25
}

fn default_max_limit() -> i64 {
    1000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - A value is outside its accepted range (see [`validate`](Self::validate))
    pub fn from_env() -> Result<Self, ConfigError> {
        // Does nothing if there is no .env file
        dotenvy::dotenv().ok();

        // database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that would otherwise misbehave at runtime: a window
    /// of zero or less refuses every signed request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WINDOW_SECONDS).contains(&self.auth_window_seconds) {
            return Err(ConfigError::OutOfRange {
                name: "AUTH_WINDOW_SECONDS",
                min: 1,
                max: MAX_WINDOW_SECONDS as u64,
            });
        }

        if self
            .credential_cache_ttl_seconds
            .is_some_and(|ttl| !(1..=MAX_CACHE_TTL_SECONDS).contains(&ttl))
        {
            return Err(ConfigError::OutOfRange {
                name: "CREDENTIAL_CACHE_TTL_SECONDS",
                min: 1,
                max: MAX_CACHE_TTL_SECONDS,
            });
        }

        if self.credential_cache_max_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: "CREDENTIAL_CACHE_MAX_CAPACITY",
                min: 1,
                max: u64::MAX,
            });
        }

        Ok(())
    }

    /// Paging defaults and bounds applied by the operation template.
    pub fn pagination(&self) -> PaginationSettings {
        PaginationSettings {
            default_limit: self.pagination_default_limit,
            default_offset: self.pagination_default_offset,
            max_limit: self.pagination_max_limit,
        }
    }

    /// Lifetime of a credential cache entry, `None` when entries never expire.
    pub fn credential_cache_ttl(&self) -> Option<Duration> {
        self.credential_cache_ttl_seconds.map(Duration::from_secs)
    }
}
