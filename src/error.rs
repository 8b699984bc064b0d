use thiserror::Error;

/// Errors raised while preparing a test. Nothing here is fatal to the host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failure to hand a finished result to its destination.
///
/// A submission failure never re-opens a finished test; callers surface it
/// as a warning and may retry with the same [`crate::result::Submission`].
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("result storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("result rejected: {0}")]
    Rejected(String),
}
