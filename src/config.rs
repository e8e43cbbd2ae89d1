//! Server configuration
//!
//! Loads configuration from environment variables, reading a `.env`
//! file first when one is present.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_WS_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATA_FILE: &str = "chat_data.json";
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE: u32 = 10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Missing required variable: {0}")]
    Missing(&'static str),
}

/// Credentials for the single owner account created at first start
#[derive(Debug, Clone)]
pub struct OwnerConfig {
    pub handle: String,
    pub display_name: String,
    /// Only needed while no owner exists yet
    pub password: Option<String>,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            handle: "owner".to_string(),
            display_name: "Owner".to_string(),
            password: None,
        }
    }
}

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket listener address
    pub ws_addr: String,
    /// HTTP listener address (static bundle + settings)
    pub http_addr: String,
    /// Snapshot file path
    pub data_file: PathBuf,
    /// Static client bundle directory
    pub static_dir: PathBuf,
    /// Periodic snapshot interval
    pub flush_interval: Duration,
    /// Login attempts allowed per handle per minute
    pub login_attempts_per_minute: u32,
    pub owner: OwnerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_addr: DEFAULT_WS_ADDR.to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            flush_interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            login_attempts_per_minute: DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE,
            owner: OwnerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        Ok(Self {
            ws_addr: env::var("CHAT_WS_ADDR").unwrap_or(defaults.ws_addr),
            http_addr: env::var("CHAT_HTTP_ADDR").unwrap_or(defaults.http_addr),
            data_file: env::var("CHAT_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            static_dir: env::var("CHAT_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            flush_interval: Duration::from_secs(parse_var(
                "CHAT_FLUSH_INTERVAL_SECS",
                DEFAULT_FLUSH_INTERVAL_SECS,
            )?),
            login_attempts_per_minute: parse_var(
                "CHAT_LOGIN_ATTEMPTS_PER_MINUTE",
                DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE,
            )?,
            owner: OwnerConfig {
                handle: env::var("CHAT_OWNER_HANDLE").unwrap_or(defaults.owner.handle),
                display_name: env::var("CHAT_OWNER_DISPLAY_NAME")
                    .unwrap_or(defaults.owner.display_name),
                password: env::var("CHAT_OWNER_PASSWORD").ok().filter(|p| !p.is_empty()),
            },
        })
    }
}

/// Parse a numeric variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ws_addr, "127.0.0.1:8080");
        assert_eq!(config.flush_interval, Duration::from_secs(30));
        assert_eq!(config.login_attempts_per_minute, 10);
        assert!(config.owner.password.is_none());
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: u64 = parse_var("CHAT_TEST_SURELY_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
