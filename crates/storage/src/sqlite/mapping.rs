use chrono::{DateTime, Utc};
use quiz_core::model::{ClassId, ResultId, ResultRecord, RollNumber, StoredResult};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Unique-key violations become `Conflict`; everything else is a transport
/// failure.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(inner) if inner.is_unique_violation() => {
            StorageError::Conflict(inner.message().to_owned())
        }
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn class_to_i64(class: ClassId) -> i64 {
    i64::from(class)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResult, StorageError> {
    let id: ResultId = row.try_get::<String, _>("id").map_err(ser)?.parse().map_err(ser)?;
    let class_id = ClassId::new(row.try_get::<i64, _>("class_id").map_err(ser)?).map_err(ser)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let roll_number =
        RollNumber::new(row.try_get::<String, _>("roll_number").map_err(ser)?).map_err(ser)?;
    let raw_score: i64 = row.try_get("score").map_err(ser)?;
    let score = u32::try_from(raw_score)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {raw_score}")))?;
    let submitted_at: Option<DateTime<Utc>> = row.try_get("submitted_at").map_err(ser)?;

    Ok(StoredResult::new(
        id,
        ResultRecord {
            class_id,
            name,
            roll_number,
            score,
            submitted_at,
        },
    ))
}
