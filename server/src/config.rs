//! Configuration management for the server.

use historical_engine::DEFAULT_SIZE_LIMIT;
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub db_max_connections: u32,
    /// Secret key for token validation (placeholder for auth)
    pub auth_secret: Option<String>,
    /// Base URL of the external describe collaborator
    pub describe_url: Option<String>,
    /// Destination channel for forwarded stream records
    pub forward_url: Option<String>,
    /// Transport size budget in bytes before a record is shrunk
    pub size_limit: usize,
    /// Shrink unconditionally (fixed small-batch forwarding channels)
    pub force_shrink: bool,
    /// Seconds a Current record lives past its event time
    pub ttl_expiry: u64,
    /// Regions whose stream records are forwarded; empty means all
    pub proxy_regions: Vec<String>,
    /// Fallback region for events that arrive without one
    pub region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidDbMaxConnections)?,
            Err(_) => 10,
        };

        let auth_secret = env::var("AUTH_SECRET").ok();
        let describe_url = env::var("DESCRIBE_URL").ok();
        let forward_url = env::var("FORWARD_URL").ok();

        let size_limit = match env::var("SIZE_LIMIT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidSizeLimit)?,
            Err(_) => DEFAULT_SIZE_LIMIT,
        };

        let force_shrink = env::var("FORCE_SHRINK")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let ttl_expiry = match env::var("TTL_EXPIRY") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidTtlExpiry)?,
            Err(_) => 86400,
        };

        let proxy_regions = env::var("PROXY_REGIONS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let region = env::var("REGION").unwrap_or_else(|_| "us-east-1".to_string());

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            auth_secret,
            describe_url,
            forward_url,
            size_limit,
            force_shrink,
            ttl_expiry,
            proxy_regions,
            region,
        })
    }

    /// Whether stream records from `region` should be forwarded.
    pub fn forwards_region(&self, region: &str) -> bool {
        self.proxy_regions.is_empty() || self.proxy_regions.iter().any(|r| r == region)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DB_MAX_CONNECTIONS value")]
    InvalidDbMaxConnections,

    #[error("Invalid SIZE_LIMIT value")]
    InvalidSizeLimit,

    #[error("Invalid TTL_EXPIRY value")]
    InvalidTtlExpiry,
}
