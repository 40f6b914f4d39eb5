//! Error types for the runtime module.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while managing preview containers.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Docker not available: {0}")]
    DockerUnavailable(String),

    #[error("Image pull failed: {0}")]
    ImagePullFailed(String),

    #[error("Container launch failed: {0}")]
    LaunchFailed(String),

    #[error("Container inspection failed: {0}")]
    InspectFailed(String),

    #[error("Container launch timed out after {0} seconds")]
    Timeout(u64),

    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
