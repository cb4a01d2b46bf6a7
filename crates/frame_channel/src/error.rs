//! Frame channel error types

use thiserror::Error;

/// No frame was returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Nothing was published within the timeout
    #[error("no frame published within {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// The wait was cancelled by `cancel_waiters`
    #[error("wait for frame cancelled")]
    Cancelled,

    /// The producer is gone and never published
    #[error("frame producer closed")]
    Closed,
}

/// Frame channel Result type alias
pub type Result<T> = std::result::Result<T, FrameError>;
