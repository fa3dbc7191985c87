use std::sync::Arc;

use quiz_core::model::{Candidate, CandidateDraft, RollNumberRule};
use storage::repository::CandidateStore;

use crate::error::IntakeError;

/// Validates intake form input and keeps the candidate in the local store.
#[derive(Clone)]
pub struct IntakeService {
    rule: RollNumberRule,
    candidates: Arc<dyn CandidateStore>,
}

impl IntakeService {
    #[must_use]
    pub fn new(rule: RollNumberRule, candidates: Arc<dyn CandidateStore>) -> Self {
        Self { rule, candidates }
    }

    /// Roll number format enforced at intake.
    #[must_use]
    pub fn rule(&self) -> &RollNumberRule {
        &self.rule
    }

    /// Validate the form and replace any previously stored candidate.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Invalid` if a field is rejected, or
    /// `IntakeError::Storage` if the candidate cannot be saved.
    pub async fn submit(&self, draft: CandidateDraft) -> Result<Candidate, IntakeError> {
        let candidate = draft.validate(&self.rule)?;
        self.candidates.save_candidate(&candidate).await?;
        tracing::info!(
            class = %candidate.class_id(),
            roll = %candidate.roll_number(),
            "candidate registered"
        );
        Ok(candidate)
    }

    /// Candidate currently held in the local store, if readable.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::Storage` if the store cannot be read.
    pub async fn current(&self) -> Result<Option<Candidate>, IntakeError> {
        Ok(self.candidates.load_candidate().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::CandidateError;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> IntakeService {
        IntakeService::new(RollNumberRule::exact_digits(8), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn valid_form_is_stored() {
        let repo = InMemoryRepository::new();
        let intake = service(&repo);
        let candidate = intake
            .submit(CandidateDraft::new(" Nisha ", "12345678", "4"))
            .await
            .unwrap();
        assert_eq!(candidate.name(), "Nisha");
        assert_eq!(repo.load_candidate().await.unwrap(), Some(candidate));
    }

    #[tokio::test]
    async fn resubmitting_overwrites() {
        let repo = InMemoryRepository::new();
        let intake = service(&repo);
        intake
            .submit(CandidateDraft::new("Nisha", "12345678", "4"))
            .await
            .unwrap();
        intake
            .submit(CandidateDraft::new("Ravi", "87654321", "5"))
            .await
            .unwrap();
        let stored = intake.current().await.unwrap().unwrap();
        assert_eq!(stored.name(), "Ravi");
        assert_eq!(stored.class_id().value(), 5);
    }

    #[tokio::test]
    async fn invalid_fields_store_nothing() {
        let repo = InMemoryRepository::new();
        let intake = service(&repo);

        let err = intake
            .submit(CandidateDraft::new("Nisha", "1234", "4"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Invalid(CandidateError::RollNumberFormat { .. })
        ));

        let err = intake
            .submit(CandidateDraft::new("", "12345678", "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Invalid(CandidateError::EmptyName)));

        let err = intake
            .submit(CandidateDraft::new("Nisha", "12345678", "11"))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Invalid(CandidateError::Id(_))));

        assert!(repo.load_candidate().await.unwrap().is_none());
    }
}
