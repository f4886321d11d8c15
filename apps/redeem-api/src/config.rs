//! Redeem API configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults suitable for a terminal-local deployment.

use serde::{Deserialize, Serialize};
use std::env;

/// Redeem API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Bind address; defaults to localhost only, this API is meant to
    /// sit behind the venue's LAN
    pub bind_address: String,

    /// Path to the terminal's SQLite database
    pub database_path: String,

    /// Identifier recorded as `redeemed_by` when the request does not
    /// name a venue terminal
    pub default_venue_id: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: env::var("REDEEM_PORT")
                .unwrap_or_else(|_| "8787".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("REDEEM_PORT".to_string()))?,

            bind_address: env::var("REDEEM_BIND").unwrap_or_else(|_| "127.0.0.1".to_string()),

            database_path: env::var("VERANDA_DB_PATH").unwrap_or_else(|_| "veranda.db".to_string()),

            default_venue_id: env::var("REDEEM_VENUE_ID").unwrap_or_else(|_| "venue".to_string()),
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
