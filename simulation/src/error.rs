//! Simulation setup errors

use gradient_core::{ConfigError, NodeId};
use thiserror::Error;

/// Errors building a simulation or live network
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink {0} is not part of the deployment")]
    SinkMissing(NodeId),

    #[error("Origin {0} is not part of the deployment")]
    OriginMissing(NodeId),

    #[error("Node task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for simulation setup
pub type SimResult<T> = Result<T, SimError>;
