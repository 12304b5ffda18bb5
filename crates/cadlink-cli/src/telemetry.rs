//! Diagnostic logging for the CLI.

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use cadlink_config::{LogFormat, LoggingConfig};

use crate::errors::AppError;

/// Sends gateway diagnostics such as retry warnings to stderr.
///
/// Installing is best effort: a subscriber set by an embedding process wins.
pub(crate) fn initialise(config: &dyn LoggingConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| AppError::LogFilter(error.to_string()))?;
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());
    let installed = match config.log_format() {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
