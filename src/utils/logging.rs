//! Structured logging setup.
//!
//! Installs a global `tracing-subscriber` fmt subscriber. `RUST_LOG` takes
//! precedence over the configured level when it is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()))
}

/// Install the global subscriber described by `config`.
///
/// Fails if the configuration is invalid, the log file cannot be opened, or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ProtocolError::ConfigError(errors.join("; ")));
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true);

    let installed = if config.log_to_file {
        // validate() guarantees the path is set
        let path = config.log_file_path.as_deref().unwrap_or_default();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?;
        let builder = builder.with_writer(Mutex::new(file)).with_ansi(false);
        if config.json_format {
            builder.json().try_init()
        } else {
            builder.try_init()
        }
    } else if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
