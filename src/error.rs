use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to callers of the controller's lifecycle operations.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("lane configuration rejected: {0}")]
    Configuration(String),
    #[error("lane cycle already running")]
    AlreadyRunning,
    #[error("lane cycle has been stopped")]
    Stopped,
}

impl CycleError {
    pub(crate) fn configuration(err: anyhow::Error) -> Self {
        CycleError::Configuration(format!("{err:#}"))
    }
}

/// Reasons an occupancy request produced no usable sample. These never leave
/// the cycle worker; the turn degrades to zero occupancy instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectorFailure {
    #[error("detector did not answer within {0:?}")]
    Timeout(Duration),
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("malformed detector result: {0}")]
    Malformed(String),
}
