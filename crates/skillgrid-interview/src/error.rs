//! Error types for skillgrid-interview

use thiserror::Error;

use crate::eligibility::Eligibility;
use crate::session::Phase;

/// Result type alias using [`InterviewError`]
pub type Result<T> = std::result::Result<T, InterviewError>;

/// Errors raised by interview operations
///
/// Scoring never fails: a missing baseline or an unreachable evaluator
/// degrades to fallback scores instead of surfacing here.
#[derive(Debug, Error)]
pub enum InterviewError {
    /// Operation requires a different phase
    #[error("Operation requires phase {expected}, session is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Session already reached its terminal phase
    #[error("Session {0} has concluded")]
    SessionConcluded(String),

    /// Candidate may not start an assessment
    #[error("Candidate {email} is not eligible: {reason:?}")]
    NotEligible { email: String, reason: Eligibility },

    /// Unrecognized skill level name
    #[error("Invalid skill level: {0}")]
    InvalidSkillLevel(String),

    /// Snapshot model error
    #[error(transparent)]
    Core(#[from] skillgrid_core::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Failures of the external text evaluator
#[derive(Debug, Clone, Error)]
pub enum EvaluatorError {
    /// Evaluator could not be reached
    #[error("Text evaluator unavailable: {0}")]
    Unavailable(String),

    /// Attempt exceeded its time budget
    #[error("Text evaluator timed out after {0} ms")]
    Timeout(u64),

    /// Response was not a usable evaluation JSON object
    #[error("Malformed evaluation: {0}")]
    Malformed(String),

    /// Score outside 0-100
    #[error("Evaluation score {0} outside 0-100")]
    ScoreOutOfRange(f64),

    /// Every attempt failed
    #[error("Text evaluator failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<EvaluatorError>,
    },
}
