use chrono::{DateTime, Utc};
use mentor_core::model::{Checkpoint, CourseId, UserId};

use super::SqliteRepository;
use super::mapping::{course_id_to_i64, index_to_i64, map_checkpoint_row, user_id_to_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_checkpoint(
        &self,
        user_id: UserId,
        course_id: CourseId,
        checkpoint: Checkpoint,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (user_id, course_id, topic_index, subtopic_index, position, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                topic_index = excluded.topic_index,
                subtopic_index = excluded.subtopic_index,
                position = excluded.position,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(course_id_to_i64(course_id)?)
        .bind(index_to_i64("topic_index", checkpoint.topic_index)?)
        .bind(index_to_i64("subtopic_index", checkpoint.subtopic_index)?)
        .bind(index_to_i64("position", checkpoint.position)?)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_checkpoint(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Checkpoint>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT topic_index, subtopic_index, position
            FROM progress
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(course_id_to_i64(course_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_checkpoint_row).transpose()
    }
}
