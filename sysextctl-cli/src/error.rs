//! CLI error type.

use sysextctl::SysextError;
use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Sysext(#[from] SysextError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to set signal handler: {0}")]
    SignalHandler(String),

    /// Some extensions in a multi-extension request failed.
    #[error("{failed} of {total} extensions failed")]
    Partial { failed: usize, total: usize },
}
