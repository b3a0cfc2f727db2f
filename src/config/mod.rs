//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,

    /// Allowed WebSocket origin host patterns (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Maximum number of concurrently running matches
    pub max_active_rooms: usize,
    /// Maximum simultaneous sockets per client IP
    pub max_conns_per_ip: u32,
    /// Inbound message budget per client IP per second
    pub messages_per_sec: u32,
    /// Trust X-Forwarded-For (server sits behind a reverse proxy)
    pub trust_proxy: bool,
    /// WebSocket read limit in bytes
    pub max_message_bytes: usize,
    /// How long a finished match keeps broadcasting its final state
    pub game_over_linger_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Some(port) = lookup("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string())
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,

            allowed_origins,
            max_active_rooms: parse_or(&lookup, "MAX_ACTIVE_ROOMS", 100)?,
            max_conns_per_ip: parse_or(&lookup, "MAX_CONNS_PER_IP", 4)?,
            messages_per_sec: parse_or(&lookup, "MESSAGES_PER_SEC", 120)?,
            trust_proxy: parse_or(&lookup, "TRUST_PROXY", false)?,
            max_message_bytes: parse_or(&lookup, "MAX_MESSAGE_BYTES", 1024)?,
            game_over_linger_secs: parse_or(&lookup, "GAME_OVER_LINGER_SECS", 30)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
