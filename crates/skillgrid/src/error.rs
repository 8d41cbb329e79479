//! Error types for the skillgrid service layer

use skillgrid_interview::InterviewError;
use thiserror::Error;

/// Result type alias using [`ServiceError`]
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Append or list on a key that holds a non-list value
    #[error("Value at {0} is not a list")]
    NotAList(String),

    /// Stored document did not match the expected shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by [`InterviewService`](crate::InterviewService)
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task {task_id} has not been started in session {session_id}")]
    TaskNotStarted { session_id: String, task_id: String },

    #[error(transparent)]
    Interview(#[from] InterviewError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
