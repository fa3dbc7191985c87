use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::Candidate;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, ser};
use crate::repository::{CANDIDATE_KEY, CandidateStore, StorageError};

#[async_trait]
impl CandidateStore for SqliteRepository {
    async fn save_candidate(&self, candidate: &Candidate) -> Result<(), StorageError> {
        let json = serde_json::to_string(candidate)?;
        sqlx::query(
            r"
                INSERT INTO local_store (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(CANDIDATE_KEY)
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn load_candidate(&self) -> Result<Option<Candidate>, StorageError> {
        let row = sqlx::query("SELECT value FROM local_store WHERE key = ?1")
            .bind(CANDIDATE_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.try_get("value").map_err(ser)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn clear_candidate(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM local_store WHERE key = ?1")
            .bind(CANDIDATE_KEY)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }
}
