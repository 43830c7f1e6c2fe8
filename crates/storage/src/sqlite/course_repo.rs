use mentor_core::model::{Course, CourseId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{course_id_from_i64, course_id_to_i64, ser};
use crate::repository::{CourseRecord, CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn allocate_course_id(&self) -> Result<CourseId, StorageError> {
        let row = sqlx::query("SELECT COALESCE(MAX(id), 0) + 1 AS next FROM courses")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        course_id_from_i64(row.try_get::<i64, _>("next").map_err(ser)?)
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let record = CourseRecord::from_course(course);
        let payload = serde_json::to_string(&record).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, payload, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload
            ",
        )
        .bind(course_id_to_i64(course.id())?)
        .bind(payload)
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query("SELECT payload FROM courses WHERE id = ?1")
            .bind(course_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload").map_err(ser)?;
                let record: CourseRecord = serde_json::from_str(&payload).map_err(ser)?;
                record.into_course().map(Some)
            }
            None => Ok(None),
        }
    }
}
