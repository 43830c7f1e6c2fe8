use std::sync::Arc;

use tracing::debug;

use mentor_core::model::{
    Course, CourseError, CourseId, QuizContent, Subtopic, SubtopicContent, Topic,
};
use storage::repository::Storage;

use crate::error::MaterializeError;
use crate::generation::{GenerationService, SubtopicContentRequest, TopicQuizRequest};

/// On-demand content materialization, gated by the generated flags.
///
/// Success merges the generated content into the stored course, which sets
/// the flag; failure leaves the flag unset so the next natural trigger
/// retries. Calling with the flag already set is a caller error.
#[derive(Clone)]
pub struct MaterializeService {
    generator: Arc<dyn GenerationService>,
    storage: Storage,
}

impl MaterializeService {
    #[must_use]
    pub fn new(generator: Arc<dyn GenerationService>, storage: Storage) -> Self {
        Self { generator, storage }
    }

    /// Generates and persists content for one subtopic.
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError` for a missing course, an out-of-range
    /// index, an already-generated subtopic, or a generation/storage failure.
    pub async fn materialize_subtopic_content(
        &self,
        course_id: CourseId,
        topic_index: usize,
        subtopic_index: usize,
    ) -> Result<SubtopicContent, MaterializeError> {
        let mut course = self.load(course_id).await?;
        let topic = Self::topic_at(&course, topic_index)?;
        let subtopic = Self::subtopic_at(topic, subtopic_index)?;
        if subtopic.content_generated() {
            return Err(CourseError::ContentAlreadyGenerated {
                topic_index,
                subtopic_index,
            }
            .into());
        }

        let request = SubtopicContentRequest {
            course_title: course.title().to_string(),
            topic_title: topic.name().to_string(),
            subtopic_title: subtopic.name().to_string(),
            subtopic_description: subtopic.description().to_string(),
            level: course.difficulty().unwrap_or_default(),
        };
        let content = self.generator.subtopic_content(&request).await?;

        course.attach_subtopic_content(topic_index, subtopic_index, content.clone())?;
        self.storage.courses.upsert_course(&course).await?;
        debug!(%course_id, topic_index, subtopic_index, "materialized subtopic content");
        Ok(content)
    }

    /// Generates and persists the quiz for one topic.
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError` for a missing course, an out-of-range
    /// index, an already-generated quiz, or a generation/storage failure.
    pub async fn materialize_topic_quiz(
        &self,
        course_id: CourseId,
        topic_index: usize,
    ) -> Result<QuizContent, MaterializeError> {
        let mut course = self.load(course_id).await?;
        let topic = Self::topic_at(&course, topic_index)?;
        if topic.quiz_generated() {
            return Err(CourseError::QuizAlreadyGenerated { topic_index }.into());
        }

        let request = TopicQuizRequest {
            course_title: course.title().to_string(),
            topic_title: topic.name().to_string(),
            topic_description: topic.description().to_string(),
            subtopic_names: topic.subtopic_names(),
            level: course.difficulty().unwrap_or_default(),
        };
        let quiz = self.generator.topic_quiz(&request).await?;

        course.attach_topic_quiz(topic_index, quiz.clone())?;
        self.storage.courses.upsert_course(&course).await?;
        debug!(%course_id, topic_index, "materialized topic quiz");
        Ok(quiz)
    }

    async fn load(&self, course_id: CourseId) -> Result<Course, MaterializeError> {
        self.storage
            .courses
            .get_course(course_id)
            .await?
            .ok_or(MaterializeError::CourseNotFound(course_id))
    }

    fn topic_at(course: &Course, index: usize) -> Result<&Topic, MaterializeError> {
        course.topic(index).ok_or_else(|| {
            CourseError::TopicIndexOutOfRange {
                index,
                len: course.topics().len(),
            }
            .into()
        })
    }

    fn subtopic_at(topic: &Topic, index: usize) -> Result<&Subtopic, MaterializeError> {
        topic.subtopic(index).ok_or_else(|| {
            CourseError::SubtopicIndexOutOfRange {
                index,
                len: topic.subtopics().len(),
            }
            .into()
        })
    }
}
