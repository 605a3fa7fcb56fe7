//! Core error types.

use thiserror::Error;

/// Source classification failures.
///
/// Classification fails closed: a link that cannot be positively matched
/// to a supported source variant is rejected, never guessed.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The link could not be parsed as a URL at all.
    #[error("malformed media link: {0}")]
    Malformed(#[from] url::ParseError),

    /// The link parsed but matches no supported source variant.
    #[error("unsupported media link: {0}")]
    Unsupported(String),
}

/// Violation of the view-state snapshot invariant.
///
/// A snapshot must carry exactly one of `file` / `url`. Hitting either
/// variant indicates a logic bug upstream, not a recoverable runtime
/// condition; callers log it loudly and refuse the snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateInvariantError {
    /// Both a vault file and a url were set.
    #[error("view state carries both a file and a url")]
    BothFileAndUrl,

    /// Neither a vault file nor a url was set.
    #[error("view state carries neither a file nor a url")]
    NeitherFileNorUrl,
}
