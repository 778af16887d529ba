use thiserror::Error;

/// Misuse of the packing primitives (e.g. `add` before `start`).
///
/// Never retried. Correct callers should not be able to produce one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
}

/// Failure reported by a content oracle for a single proposal.
///
/// Everything except `Terminal` is retried by the section assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("Oracle call timed out")]
    Timeout,

    #[error("Oracle rate limited: {0}")]
    RateLimited(String),

    #[error("Oracle returned malformed content: {0}")]
    Malformed(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle rejected the request: {0}")]
    Terminal(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OracleError::Terminal(_))
    }
}

/// Application-level error type for the driver and the course orchestrator.
///
/// Per-lesson failures never surface here; they are absorbed into
/// `LessonResult::status` by the assembler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Orchestration error: {0}")]
    Orchestration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
