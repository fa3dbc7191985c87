use std::sync::Arc;

use quiz_core::model::QuizSettings;
use storage::repository::{CandidateStore, QuestionTable, ResultStore, StorageError};

use super::service::QuizSession;
use crate::Clock;
use crate::error::QuizError;

/// Starts quiz sessions for the candidate held in the local store.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    settings: QuizSettings,
    questions: Arc<dyn QuestionTable>,
    results: Arc<dyn ResultStore>,
    candidates: Arc<dyn CandidateStore>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        questions: Arc<dyn QuestionTable>,
        results: Arc<dyn ResultStore>,
        candidates: Arc<dyn CandidateStore>,
    ) -> Self {
        Self {
            clock,
            settings,
            questions,
            results,
            candidates,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Load the stored candidate and open a session on their class's questions.
    ///
    /// An unreadable candidate entry is treated as absent.
    ///
    /// # Errors
    ///
    /// - `QuizError::NoCandidate` if nothing usable is stored.
    /// - `QuizError::QuizNotFound` if the class has no question set.
    /// - `QuizError::Storage` if the local store cannot be read.
    pub async fn start_session(&self) -> Result<QuizSession, QuizError> {
        let candidate = match self.candidates.load_candidate().await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return Err(QuizError::NoCandidate),
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(%reason, "stored candidate is unreadable");
                return Err(QuizError::NoCandidate);
            }
            Err(err) => return Err(err.into()),
        };

        let class_id = candidate.class_id();
        let questions = self
            .questions
            .question_set(class_id)
            .ok_or(QuizError::QuizNotFound(class_id))?;

        tracing::info!(
            class = %class_id,
            roll = %candidate.roll_number(),
            questions = questions.len(),
            timed = self.settings.enable_timer(),
            "starting quiz session"
        );
        Ok(QuizSession::new(
            candidate,
            questions,
            self.settings,
            Arc::clone(&self.results),
            Arc::clone(&self.candidates),
            self.clock,
        ))
    }
}
