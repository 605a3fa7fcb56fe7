//! Bridge error types.

use std::time::Duration;

use thiserror::Error;

/// Failures of the injection machinery itself.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("failed to stage script: {0}")]
    Io(#[from] std::io::Error),

    /// The privileged host refused or failed to run a staged script.
    #[error("host injection failed: {0}")]
    Host(String),

    /// A control operation was not acknowledged.
    #[error("control channel error: {0}")]
    Control(String),
}

/// What a readiness waiter can observe.
///
/// `Timeout` is per-waiter: it does not move the shared readiness state,
/// so a slow-but-successful injection still resolves for patient callers.
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("injection failed: {0}")]
    Failed(String),

    #[error("timed out after {0:?} waiting for injection readiness")]
    Timeout(Duration),
}
