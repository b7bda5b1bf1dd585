use thiserror::Error;

use crate::event::EventError;
use crate::shared::AppError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Malformed result: {0}")]
    MalformedResult(String),
}

impl From<AppError> for ScoringError {
    fn from(err: AppError) -> Self {
        ScoringError::Store(err.to_string())
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Store(msg) => AppError::DatabaseError(msg),
            ScoringError::MalformedResult(msg) => AppError::Validation(msg),
        }
    }
}

/// Store failures are worth another delivery; malformed input is not
impl From<ScoringError> for EventError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Store(_) => EventError::retryable(err.to_string()),
            ScoringError::MalformedResult(_) => EventError::non_retryable(err.to_string()),
        }
    }
}
