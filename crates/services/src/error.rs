//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AttemptError, CandidateError, ClassId, RollNumber};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the quiz session and `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no candidate details found; fill in the intake form first")]
    NoCandidate,

    #[error("quiz not found for class {0}")]
    QuizNotFound(ClassId),

    #[error("roll number {roll_number} has already taken the class {class_id} quiz")]
    AlreadySubmitted {
        class_id: ClassId,
        roll_number: RollNumber,
    },

    #[error("something went wrong while submitting; try again")]
    SubmissionFailed(#[source] StorageError),

    #[error(transparent)]
    Attempt(#[from] AttemptError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    /// The session cannot continue; the candidate goes back to intake.
    #[must_use]
    pub fn returns_to_intake(&self) -> bool {
        matches!(
            self,
            Self::NoCandidate | Self::QuizNotFound(_) | Self::AlreadySubmitted { .. }
        )
    }

    /// The candidate can correct the problem and retry the same action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SubmissionFailed(_)
                | Self::Attempt(AttemptError::IncompletePage { .. })
                | Self::Attempt(AttemptError::QuestionUnavailable { .. })
                | Self::Attempt(AttemptError::NoNextPage)
        )
    }
}

/// Errors emitted by `IntakeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IntakeError {
    #[error(transparent)]
    Invalid(#[from] CandidateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    #[error("admin view is not configured")]
    Disabled,
    #[error("wrong admin key")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised while assembling `AppServices`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
