use std::sync::Arc;

use quiz_core::model::{ClassId, StoredResult};
use storage::repository::ResultStore;

use crate::error::AdminError;

/// Gatekeeper for the per-class results listing.
#[derive(Clone)]
pub struct AdminService {
    admin_key: Option<String>,
    results: Arc<dyn ResultStore>,
}

impl AdminService {
    /// A blank key disables the admin view.
    #[must_use]
    pub fn new(admin_key: Option<String>, results: Arc<dyn ResultStore>) -> Self {
        let admin_key = admin_key.filter(|key| !key.trim().is_empty());
        Self { admin_key, results }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.admin_key.is_some()
    }

    /// # Errors
    ///
    /// Returns `AdminError::Disabled` when no key is configured, or
    /// `AdminError::Unauthorized` when `key` does not match.
    pub fn login(&self, key: &str) -> Result<AdminView, AdminError> {
        let Some(expected) = self.admin_key.as_deref() else {
            return Err(AdminError::Disabled);
        };
        if key.trim() != expected.trim() {
            tracing::warn!("admin login rejected");
            return Err(AdminError::Unauthorized);
        }
        tracing::info!("admin view unlocked");
        Ok(AdminView {
            results: Arc::clone(&self.results),
        })
    }
}

/// Unlocked admin access.
#[derive(Clone)]
pub struct AdminView {
    results: Arc<dyn ResultStore>,
}

impl AdminView {
    /// Every stored result for `class`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Storage` if the results store cannot be queried.
    pub async fn class_results(&self, class: ClassId) -> Result<Vec<StoredResult>, AdminError> {
        Ok(self.results.list_results(class).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{CandidateDraft, ResultRecord, RollNumberRule};
    use storage::repository::InMemoryRepository;

    fn record(name: &str, roll: &str, class: &str, score: u32) -> ResultRecord {
        let candidate = CandidateDraft::new(name, roll, class)
            .validate(&RollNumberRule::any())
            .unwrap();
        ResultRecord::for_candidate(&candidate, score, None)
    }

    #[test]
    fn disabled_without_key() {
        let repo = InMemoryRepository::new();
        let admin = AdminService::new(None, Arc::new(repo.clone()));
        assert!(!admin.is_enabled());
        assert!(matches!(admin.login("anything"), Err(AdminError::Disabled)));

        let blank = AdminService::new(Some("  ".into()), Arc::new(repo));
        assert!(matches!(blank.login(""), Err(AdminError::Disabled)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let admin = AdminService::new(Some("secret".into()), Arc::new(InMemoryRepository::new()));
        assert!(matches!(admin.login("guess"), Err(AdminError::Unauthorized)));
    }

    #[tokio::test]
    async fn lists_class_results_in_insertion_order() {
        let repo = InMemoryRepository::new();
        repo.append_result(&record("Nisha", "1", "4", 3)).await.unwrap();
        repo.append_result(&record("Ravi", "2", "5", 1)).await.unwrap();
        repo.append_result(&record("Asha", "3", "4", 5)).await.unwrap();

        let admin = AdminService::new(Some("secret".into()), Arc::new(repo));
        let view = admin.login("secret").unwrap();

        let class_four = view.class_results(ClassId::new(4).unwrap()).await.unwrap();
        let names: Vec<_> = class_four.iter().map(|r| r.record.name.as_str()).collect();
        assert_eq!(names, ["Nisha", "Asha"]);

        let empty = view.class_results(ClassId::new(7).unwrap()).await.unwrap();
        assert!(empty.is_empty());
    }
}
