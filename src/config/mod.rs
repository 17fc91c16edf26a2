//! Configuration module for the Wishbox backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default capacity of a live connection's outbound event queue.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key expected from the upstream gateway on `/api` routes
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Outbound queue capacity per push connection
    pub subscriber_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("WISHBOX_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("WISHBOX_DB_PATH")
            .unwrap_or_else(|_| "./data/wishbox.sqlite".to_string())
            .into();

        let raw_addr =
            env::var("WISHBOX_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| ConfigError(format!("Invalid WISHBOX_BIND_ADDR: {}", raw_addr)))?;

        let log_level = env::var("WISHBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let subscriber_buffer = match env::var("WISHBOX_SUBSCRIBER_BUFFER") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(
                        "Ignoring invalid WISHBOX_SUBSCRIBER_BUFFER {:?}, using {}",
                        raw,
                        DEFAULT_SUBSCRIBER_BUFFER
                    );
                    DEFAULT_SUBSCRIBER_BUFFER
                }
            },
            Err(_) => DEFAULT_SUBSCRIBER_BUFFER,
        };

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            subscriber_buffer,
        })
    }
}

/// Configuration could not be loaded.
///
/// Returned by [`Config::from_env`] when a variable that has no safe fallback,
/// such as `WISHBOX_BIND_ADDR`, holds an unparseable value.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}
