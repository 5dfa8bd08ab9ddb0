//! Configuration management for the server.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use syncline_engine::SyncConfig;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Size of the connection pool
    pub database_max_connections: u32,
    /// Reject requests without an Authorization header
    pub require_auth: bool,
    /// Create unknown client groups on push
    pub create_client_group_on_push: bool,
    /// Create unknown client groups on pull
    pub create_client_group_on_pull: bool,
    /// Attempts per request before a serialization conflict is surfaced
    pub tx_max_attempts: u32,
    /// Delay before the first retry of a conflicting transaction
    pub tx_retry_backoff: Duration,
    /// Deadline per push or pull, `None` for no deadline
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = parse(&lookup, "PORT", 3000)?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let request_timeout_ms: u64 = parse(&lookup, "REQUEST_TIMEOUT_MS", 30_000)?;

        Ok(Self {
            host,
            port,
            database_url,
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            require_auth: parse_flag(&lookup, "REQUIRE_AUTH", false)?,
            create_client_group_on_push: parse_flag(&lookup, "CREATE_CLIENT_GROUP_ON_PUSH", true)?,
            create_client_group_on_pull: parse_flag(&lookup, "CREATE_CLIENT_GROUP_ON_PULL", false)?,
            tx_max_attempts: parse(&lookup, "TX_MAX_ATTEMPTS", 5)?,
            tx_retry_backoff: Duration::from_millis(parse(&lookup, "TX_RETRY_BACKOFF_MS", 10)?),
            request_timeout: (request_timeout_ms > 0)
                .then(|| Duration::from_millis(request_timeout_ms)),
        })
    }

    /// Engine settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let base = SyncConfig::default();
        let max_backoff = base.max_retry_backoff;
        base.with_create_on_push(self.create_client_group_on_push)
            .with_create_on_pull(self.create_client_group_on_pull)
            .with_max_attempts(self.tx_max_attempts)
            .with_retry_backoff(self.tx_retry_backoff, max_backoff)
            .with_request_timeout(self.request_timeout)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name).as_deref().map(str::trim) {
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid {0} value")]
    Invalid(&'static str),
}
