//! Environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use gamemaster_narrator::NarratorConfig;
use gamemaster_narrator::client::{DEFAULT_NARRATOR_BASE_URL, DEFAULT_NARRATOR_MODEL};

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_NARRATOR_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Server settings, read once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Bind address.
    pub addr: SocketAddr,
    /// sqlx pool size.
    pub db_max_connections: u32,
    /// Narrator endpoint.
    pub narrator: NarratorConfig,
    /// Buffered events per broadcast subscriber.
    pub broadcast_capacity: usize,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otel_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which returns a variable's value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port: u16 = parse(&lookup, "PORT", DEFAULT_PORT)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
        let timeout_secs: u64 = parse(&lookup, "NARRATOR_TIMEOUT_SECS", DEFAULT_NARRATOR_TIMEOUT_SECS)?;
        let broadcast_capacity: usize =
            parse(&lookup, "BROADCAST_CAPACITY", DEFAULT_BROADCAST_CAPACITY)?;
        if broadcast_capacity == 0 {
            return Err(AppError::Config("BROADCAST_CAPACITY must be positive".into()));
        }

        Ok(Self {
            database_url,
            addr,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            narrator: NarratorConfig {
                base_url: lookup("NARRATOR_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_NARRATOR_BASE_URL.to_owned()),
                model: lookup("NARRATOR_MODEL").unwrap_or_else(|| DEFAULT_NARRATOR_MODEL.to_owned()),
                timeout: Duration::from_secs(timeout_secs),
            },
            broadcast_capacity,
            otel_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} is invalid: {e}"))),
        None => Ok(default),
    }
}
