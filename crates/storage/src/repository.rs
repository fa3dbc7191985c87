use async_trait::async_trait;
use quiz_core::QuestionBank;
use quiz_core::model::{
    Candidate, ClassId, QuestionSet, ResultId, ResultRecord, RollNumber, StoredResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Local-store key under which the intake form leaves the candidate.
pub const CANDIDATE_KEY: &str = "quizUser";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Per-class results table.
///
/// Only lookup by roll number, append, and listing are offered. Uniqueness of
/// `(class, roll_number)` is not enforced here; callers check before writing.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Find an existing result for `roll` in `class`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn find_result(
        &self,
        class: ClassId,
        roll: &RollNumber,
    ) -> Result<Option<StoredResult>, StorageError>;

    /// Append a new result and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError>;

    /// All results for `class`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn list_results(&self, class: ClassId) -> Result<Vec<StoredResult>, StorageError>;
}

/// Client-local key-value slot holding the candidate between intake and quiz.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Replace the stored candidate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the candidate cannot be serialized or stored.
    async fn save_candidate(&self, candidate: &Candidate) -> Result<(), StorageError>;

    /// Read the stored candidate, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for a corrupt entry, or other
    /// storage errors.
    async fn load_candidate(&self) -> Result<Option<Candidate>, StorageError>;

    /// Remove the stored candidate. Removing a missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be updated.
    async fn clear_candidate(&self) -> Result<(), StorageError>;
}

/// Static `class → question set` lookup. Read-only and local.
pub trait QuestionTable: Send + Sync {
    fn question_set(&self, class: ClassId) -> Option<QuestionSet>;
}

impl QuestionTable for QuestionBank {
    fn question_set(&self, class: ClassId) -> Option<QuestionSet> {
        self.get(class).cloned()
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// In-memory results and local store for tests and prototyping.
///
/// The candidate is kept as serialized JSON so round-trips behave like the
/// persistent adapters.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<HashMap<ClassId, Vec<StoredResult>>>>,
    local: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw local-store value, bypassing serialization.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[async_trait]
impl ResultStore for InMemoryRepository {
    async fn find_result(
        &self,
        class: ClassId,
        roll: &RollNumber,
    ) -> Result<Option<StoredResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(&class)
            .and_then(|rows| rows.iter().find(|r| &r.record.roll_number == roll))
            .cloned())
    }

    async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = ResultId::generate();
        guard
            .entry(record.class_id)
            .or_default()
            .push(StoredResult::new(id, record.clone()));
        Ok(id)
    }

    async fn list_results(&self, class: ClassId) -> Result<Vec<StoredResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&class).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CandidateStore for InMemoryRepository {
    async fn save_candidate(&self, candidate: &Candidate) -> Result<(), StorageError> {
        let json = serde_json::to_string(candidate)?;
        self.put_raw(CANDIDATE_KEY, &json)
    }

    async fn load_candidate(&self) -> Result<Option<Candidate>, StorageError> {
        let raw = {
            let guard = self
                .local
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.get(CANDIDATE_KEY).cloned()
        };
        raw.map(|json| serde_json::from_str(&json).map_err(StorageError::from))
            .transpose()
    }

    async fn clear_candidate(&self) -> Result<(), StorageError> {
        let mut guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(CANDIDATE_KEY);
        Ok(())
    }
}

/// Results store and local store behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ResultStore>,
    pub candidates: Arc<dyn CandidateStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let results: Arc<dyn ResultStore> = Arc::new(repo.clone());
        let candidates: Arc<dyn CandidateStore> = Arc::new(repo);
        Self {
            results,
            candidates,
        }
    }
}
