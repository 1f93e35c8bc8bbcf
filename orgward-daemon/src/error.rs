//! Error types for orgward-daemon.

use thiserror::Error;

use orgward_engine::EngineError;
use orgward_forge::ForgeError;

/// All errors that can arise from daemon operation.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("daemon protocol error: {0}")]
    Protocol(String),
}
