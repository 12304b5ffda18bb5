//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use cadlink_gateway::GatewayError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("--params is not valid JSON: {0}")]
    ParseParams(serde_json::Error),
    #[error("--params must be a JSON object")]
    ParamsNotObject,
    #[error("invalid log filter: {0}")]
    LogFilter(String),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("failed to serialise output: {0}")]
    Serialise(serde_json::Error),
    #[error("failed to write output: {0}")]
    Emit(io::Error),
}
