//! Error types for the exam flow and the external store.
//!
//! `StoreError` lives here rather than in `cbt-store` so the application
//! state can classify store failures (offline vs. rejected) without string
//! matching.

use thiserror::Error;

use crate::model::ExamType;

/// Errors returned by a [`ResultStore`](crate::traits::ResultStore) round trip.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The server could not be reached at all.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The server answered with an error status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Returns `true` if the store could not be contacted, as opposed to the
    /// store answering with a rejection.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unreachable(_) | StoreError::Timeout(_))
    }
}

/// Errors surfaced by the exam flow and admin operations.
///
/// None of these are fatal: every variant maps to a notice and the caller
/// returns to a navigable state.
#[derive(Debug, Error)]
pub enum CbtError {
    /// Zero matching questions for a non-practice session.
    #[error("no {exam_type} questions available for {subject}")]
    NoQuestionsAvailable { subject: String, exam_type: ExamType },

    /// Any network or server failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bulk import text is not a JSON array of valid questions.
    #[error("malformed bulk import: {reason}")]
    MalformedBulkImport { reason: String },

    /// A question failed field validation before any store call.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The admin shared secret did not match.
    #[error("invalid password")]
    Unauthorized,

    /// An operation needed a running session and there is none.
    #[error("no active session")]
    NoActiveSession,
}

impl CbtError {
    /// The message shown to the user for this error.
    pub fn notice(&self) -> String {
        match self {
            CbtError::NoQuestionsAvailable { .. } => {
                "No questions available yet. Try Practice mode or upload questions via Admin."
                    .to_string()
            }
            CbtError::Store(e) if e.is_connectivity() => {
                "Error connecting to database. Using offline mode.".to_string()
            }
            CbtError::Store(e) => format!("Server error: {e}"),
            CbtError::MalformedBulkImport { .. } => {
                "Invalid JSON format. Please check the template.".to_string()
            }
            CbtError::Validation(_) => "Please fill all fields".to_string(),
            CbtError::Unauthorized => "Invalid password".to_string(),
            CbtError::NoActiveSession => "No exam in progress".to_string(),
        }
    }
}
