//! # Configuration Management
//!
//! Settings for the handshake client and its logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`MYSQL_HANDSHAKE_*`)
//!
//! Credentials are deliberately not part of the configuration; pass them to the
//! client per connection.

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Protocol version carried in the server greeting
pub const PROTOCOL_VERSION: u8 = 10;

/// Max body size expressible in the 3-byte length header
pub const MAX_PAYLOAD_SIZE: usize = 0xFF_FFFF;

/// utf8mb4_0900_ai_ci
pub const DEFAULT_CHARSET: u8 = 0xFF;

/// Max packet size advertised to the server (16 MB)
pub const DEFAULT_MAX_PACKET_SIZE: u32 = 16 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HandshakeConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HandshakeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `MYSQL_HANDSHAKE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MYSQL_HANDSHAKE_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(timeout) = std::env::var("MYSQL_HANDSHAKE_CONNECT_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid MYSQL_HANDSHAKE_CONNECT_TIMEOUT_MS: {e}"))
            })?;
            config.client.connect_timeout = Duration::from_millis(val);
        }

        if let Ok(timeout) = std::env::var("MYSQL_HANDSHAKE_READ_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid MYSQL_HANDSHAKE_READ_TIMEOUT_MS: {e}"))
            })?;
            config.client.read_timeout = Duration::from_millis(val);
        }

        if let Ok(charset) = std::env::var("MYSQL_HANDSHAKE_CHARSET") {
            config.client.charset = charset.parse::<u8>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid MYSQL_HANDSHAKE_CHARSET: {e}"))
            })?;
        }

        if let Ok(level) = std::env::var("MYSQL_HANDSHAKE_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid MYSQL_HANDSHAKE_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration. An empty list means the configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Client connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server address (e.g., "127.0.0.1:3306")
    pub address: String,

    /// Timeout for the TCP connect
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Deadline for each packet read during the handshake
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Character set id sent in the handshake response
    pub charset: u8,

    /// Max packet size advertised to the server
    pub max_packet_size: u32,

    /// Request CLIENT_MULTI_STATEMENTS
    #[serde(default)]
    pub multi_statements: bool,

    /// Request CLIENT_FOUND_ROWS
    #[serde(default)]
    pub found_rows: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:3306"),
            connect_timeout: timeout::DEFAULT_TIMEOUT,
            read_timeout: timeout::DEFAULT_TIMEOUT,
            charset: DEFAULT_CHARSET,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            multi_statements: false,
            found_rows: false,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if !self.address.contains(':') {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: 'host:3306')",
                self.address
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        if self.read_timeout.as_millis() < 100 {
            errors.push("Read timeout too short (minimum: 100ms)".to_string());
        } else if self.read_timeout.as_secs() > 300 {
            errors.push("Read timeout too long (maximum: 300s)".to_string());
        }

        if self.charset == 0 {
            errors.push("Charset id 0 is not a valid collation".to_string());
        }

        if self.max_packet_size < 1024 {
            errors.push("Max packet size too small (minimum: 1 KB)".to_string());
        } else if self.max_packet_size > 1024 * 1024 * 1024 {
            errors.push(format!(
                "Max packet size too large: {} bytes (server maximum: 1 GB)",
                self.max_packet_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level (overridden by `RUST_LOG` when set)
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mysql-handshake"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Durations as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// `tracing::Level` as a lowercase string
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
