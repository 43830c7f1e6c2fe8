use mentor_core::model::{Checkpoint, CourseId, UserId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn course_id_to_i64(id: CourseId) -> Result<i64, StorageError> {
    u64_to_i64("course_id", id.value())
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    u64_to_i64("user_id", id.value())
}

fn index_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn index_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_checkpoint_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Checkpoint, StorageError> {
    Ok(Checkpoint::new(
        index_from_i64("topic_index", row.try_get::<i64, _>("topic_index").map_err(ser)?)?,
        index_from_i64(
            "subtopic_index",
            row.try_get::<i64, _>("subtopic_index").map_err(ser)?,
        )?,
        index_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
    ))
}
