use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the plumbing around the orchestrator (config loading,
/// validation). Oracle failures never surface here; see [`crate::core::oracle::InvokeError`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to read {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
