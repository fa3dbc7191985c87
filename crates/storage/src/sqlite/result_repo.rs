use async_trait::async_trait;
use quiz_core::model::{ClassId, ResultId, ResultRecord, RollNumber, StoredResult};

use super::SqliteRepository;
use super::mapping::{class_to_i64, db, map_result_row};
use crate::repository::{ResultStore, StorageError};

#[async_trait]
impl ResultStore for SqliteRepository {
    async fn find_result(
        &self,
        class: ClassId,
        roll: &RollNumber,
    ) -> Result<Option<StoredResult>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, class_id, name, roll_number, score, submitted_at
                FROM quiz_results
                WHERE class_id = ?1 AND roll_number = ?2
                ORDER BY rowid ASC
                LIMIT 1
            ",
        )
        .bind(class_to_i64(class))
        .bind(roll.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_result_row).transpose()
    }

    async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError> {
        let id = ResultId::generate();
        sqlx::query(
            r"
                INSERT INTO quiz_results (id, class_id, name, roll_number, score, submitted_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id.to_string())
        .bind(class_to_i64(record.class_id))
        .bind(&record.name)
        .bind(record.roll_number.as_str())
        .bind(i64::from(record.score))
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        tracing::debug!(%id, class = %record.class_id, "result appended");
        Ok(id)
    }

    async fn list_results(&self, class: ClassId) -> Result<Vec<StoredResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, class_id, name, roll_number, score, submitted_at
                FROM quiz_results
                WHERE class_id = ?1
                ORDER BY rowid ASC
            ",
        )
        .bind(class_to_i64(class))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_result_row(row)?);
        }
        Ok(out)
    }
}
