//! Sync channel error types.

use thiserror::Error;

/// Channel-level failures.
///
/// None of these are fatal to the owning view: the channel recovers by
/// transitioning to unbound and the local store keeps its authority.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The underlying port is gone; the peer is treated as detached.
    #[error("sync port closed")]
    Closed,

    /// A message could not be serialized for the boundary.
    #[error("failed to encode sync message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The channel was already detached by a `bye` or an earlier failure.
    #[error("sync channel detached")]
    Detached,
}

pub type SyncResult<T> = Result<T, SyncError>;
