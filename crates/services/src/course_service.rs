use std::sync::Arc;

use mentor_core::Clock;
use mentor_core::model::{Course, CourseId, UserId};
use storage::repository::Storage;

use crate::error::CourseServiceError;
use crate::generation::{GenerationService, OutlineRequest};

/// Creates and fetches courses. Generation produces only the outline;
/// subtopic content and quizzes are materialized later, on demand.
#[derive(Clone)]
pub struct CourseService {
    generator: Arc<dyn GenerationService>,
    storage: Storage,
    clock: Clock,
}

impl CourseService {
    #[must_use]
    pub fn new(generator: Arc<dyn GenerationService>, storage: Storage, clock: Clock) -> Self {
        Self {
            generator,
            storage,
            clock,
        }
    }

    /// Generates a course outline, gives it an identity, and persists it.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError` when generation or persistence fails.
    pub async fn generate_course(
        &self,
        created_by: UserId,
        request: OutlineRequest,
    ) -> Result<Course, CourseServiceError> {
        let outline = self.generator.outline(&request).await?;
        let id = self.storage.courses.allocate_course_id().await?;
        let course = outline.into_course(id, created_by, request.situation, self.clock.now());
        self.storage.courses.upsert_course(&course).await?;
        Ok(course)
    }

    /// Fetches a stored course; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError` for storage failures.
    pub async fn get_course(&self, id: CourseId) -> Result<Option<Course>, CourseServiceError> {
        Ok(self.storage.courses.get_course(id).await?)
    }
}
