//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level.

use std::fmt;
use tracing_subscriber::{fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

#[derive(Debug)]
pub struct LoggingInitError(String);

impl fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to initialize logging: {}", self.0)
    }
}

impl std::error::Error for LoggingInitError {}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let result = match config.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tfmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tfmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| LoggingInitError(e.to_string()))?;

    tracing::debug!(level = %config.log_level, format = ?config.log_format, "Logging initialized");
    Ok(())
}
